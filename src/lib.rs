//! Core data-model and concurrency substrate for a GPU-API validation
//! layer: sparse interval containers, subresource/image-range encoding, and
//! the per-queue submission engine that tracks in-flight work.
//!
//! This crate owns none of the higher-level per-object validation state; it
//! gives that state somewhere correct and fast to live.
//!
//! # Feature flags
#![doc = document_features::document_features!()]

#![allow(
    // Redundant matching is more explicit.
    clippy::redundant_pattern_matching,
    // No need for defaults in the internal types.
    clippy::new_without_default,
)]
#![warn(trivial_casts, trivial_numeric_casts, unused_extern_crates, unused_qualifications)]

pub mod config;
pub mod containers;
pub mod error;
pub mod queue;
pub mod subresource;

use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// Hasher used throughout for id-keyed maps where input keys are already
/// well distributed (handle ids, type ids) and don't need DoS resistance.
pub type FastHashMap<K, V> = std::collections::HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub type FastHashSet<K> = std::collections::HashSet<K, BuildHasherDefault<FxHasher>>;

/// Like `debug_assert!`, but also checked in release builds when the
/// `strict_asserts` feature is enabled, for invariants cheap enough to
/// keep paying for in production.
#[macro_export]
macro_rules! strict_assert {
    ($($arg:tt)*) => {
        if cfg!(feature = "strict_asserts") {
            assert!($($arg)*);
        } else {
            debug_assert!($($arg)*);
        }
    };
}

/// Logs at `info` when the `diagnostics_log_info` feature is enabled, at
/// `debug` otherwise. For sub-state and queue-progress diagnostics that are
/// routine at `debug` but worth promoting when a consumer is actively
/// chasing a submission-ordering issue.
#[macro_export]
macro_rules! log_diag {
    ($($arg:tt)*) => {
        if cfg!(feature = "diagnostics_log_info") {
            log::info!($($arg)*);
        } else {
            log::debug!($($arg)*);
        }
    };
}
