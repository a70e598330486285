//! Runtime-tunable knobs. `small_range_map_capacity`/`small_vector_inline_capacity`
//! are const generics on [`crate::containers::SmallRangeMap`]/[`crate::containers::SmallVec`]
//! rather than fields here, since they size inline arrays at compile time;
//! this `Config` covers the one knob that is genuinely a runtime value.

use std::time::Duration;

/// Per-queue configuration.
#[derive(Clone, Copy, Debug)]
pub struct QueueConfig {
    /// Absolute deadline used by `Queue::wait`. The source's default is
    /// "tens of seconds"; 30s matches it.
    pub cond_wait_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            cond_wait_timeout: Duration::from_secs(30),
        }
    }
}
