//! Recoverable error types. Programmer errors (bad hints, out-of-range
//! keys, double-destroy) are `debug_assert!`s at the call site instead,
//! per the crate's error-handling split; see the containers and queue
//! modules for those.

use thiserror::Error;

/// A fallible construction or lifecycle operation failed.
#[derive(Clone, Debug, Error)]
pub enum CoreError {
    #[error("aspect/mip/layer limits ({aspect_count}, {mip_count}, {layer_count}) describe zero subresources")]
    DegenerateLimits {
        aspect_count: u32,
        mip_count: u32,
        layer_count: u32,
    },

    #[error("aspect mask {mask:#x} is not one of the supported canonical combinations")]
    UnsupportedAspectMask { mask: u32 },

    #[error("failed to spawn queue worker thread: {message}")]
    WorkerSpawnFailed { message: String },

    #[error("queue was already destroyed")]
    QueueDestroyed,
}
