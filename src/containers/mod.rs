//! Sparse interval containers: the half-open range primitive, a tree-backed
//! map of them, a fixed-capacity array-backed specialization, and the
//! inline-storage-first vector the rest of the crate builds small
//! collections out of.

mod range;
mod range_map;
mod small_range_map;
mod small_vec;

pub use range::{intersect_spans, Range};
pub use range_map::{splice, CachedLowerBound, Index, ParallelIterator, RangeMap, Splicer, ValuePrecedence};
pub use small_range_map::{SmallIndex, SmallRangeMap};
pub use small_vec::SmallVec;
