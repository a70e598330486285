//! Subresource index encoding (dense `(aspect, mip, layer)` indices) and
//! image byte-range encoding (per-subresource memory layout).

mod encoder;
mod image_range;

pub use encoder::{
    canonical_aspect_params, AspectMask, AspectParameters, Limits, RangeEncoder, RangeGenerator, Subresource,
    SubresourceRange,
};
pub use image_range::{ImageDescription, ImageRangeEncoder, ImageRangeGenerator, SubresourceLayout, SubresourceSpans};
