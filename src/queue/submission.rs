//! Semaphores, command-buffer submission records, and the one-shot
//! completion cell submissions are retired through.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::containers::SmallVec;

/// Opaque 64-bit semaphore payload: a binary semaphore's generation counter,
/// or a timeline semaphore's monotonically increasing value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SemaphorePayload(pub u64);

#[derive(Clone, Copy, Debug)]
struct TimelineWait {
    queue_seq: u64,
    payload: SemaphorePayload,
}

#[derive(Clone, Copy, Debug)]
struct TimelineSignal {
    queue_seq: u64,
    payload: SemaphorePayload,
}

#[derive(Default)]
struct SemaphoreState {
    waits: Vec<TimelineWait>,
    signals: Vec<TimelineSignal>,
}

/// A binary or timeline semaphore. Queues record waits/signals against it at
/// `PreSubmit` time and retire them once the owning submission completes;
/// `FindTimelineWaitWithoutResolvingSignal` reads it independently of any
/// queue lock.
pub struct Semaphore {
    pub id: u64,
    pub timeline: bool,
    state: RwLock<SemaphoreState>,
}

impl Semaphore {
    pub fn new(id: u64, timeline: bool) -> Arc<Self> {
        Arc::new(Semaphore { id, timeline, state: RwLock::new(SemaphoreState::default()) })
    }

    pub fn enqueue_wait(&self, queue_seq: u64, payload: SemaphorePayload) {
        self.state.write().waits.push(TimelineWait { queue_seq, payload });
    }

    pub fn enqueue_signal(&self, queue_seq: u64, payload: SemaphorePayload) {
        self.state.write().signals.push(TimelineSignal { queue_seq, payload });
    }

    pub fn retire_wait(&self, queue_seq: u64) {
        self.state.write().waits.retain(|w| w.queue_seq != queue_seq);
    }

    pub fn retire_signal(&self, queue_seq: u64) {
        self.state.write().signals.retain(|s| s.queue_seq != queue_seq);
    }

    /// True if some recorded signal (from any queue) resolves `payload`: for
    /// a timeline semaphore, any signal with an equal-or-greater value.
    pub fn has_resolving_signal(&self, payload: SemaphorePayload) -> bool {
        self.state.read().signals.iter().any(|s| s.payload >= payload)
    }

    /// Earliest-enqueued wait with `queue_seq <= until_seq`, if any.
    fn earliest_wait_at_or_before(&self, until_seq: u64) -> Option<(u64, SemaphorePayload)> {
        self.state
            .read()
            .waits
            .iter()
            .filter(|w| w.queue_seq <= until_seq)
            .min_by_key(|w| w.queue_seq)
            .map(|w| (w.queue_seq, w.payload))
    }
}

#[derive(Clone)]
pub struct SemaphoreInfo {
    pub semaphore: Arc<Semaphore>,
    pub payload: SemaphorePayload,
}

/// A recorded primary command buffer plus whichever secondary buffers it
/// links in, identified by opaque ids (resolved by the caller, not the
/// core, against its own command-buffer table).
#[derive(Clone, Debug)]
pub struct CommandBufferSubmission {
    pub command_buffer_id: u64,
    pub secondary_ids: SmallVec<u64, 4>,
}

/// One-shot broadcast cell. Plays both the `Promise` and `SharedFuture`
/// roles from the source: in Rust, sharing one `Arc<Completion>` between the
/// retiring worker and every `Wait` caller does the job a separate
/// future-handle type exists to do in a language without reference counting.
pub struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub fn new() -> Arc<Self> {
        Arc::new(Completion { done: Mutex::new(false), cond: Condvar::new() })
    }

    pub fn fulfill(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock()
    }

    /// Waits up to `timeout` for fulfillment. Returns whether it was (or
    /// already had been) fulfilled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut done = self.done.lock();
        if *done {
            return true;
        }
        self.cond.wait_for(&mut done, timeout);
        *done
    }
}

/// Caller-supplied submission, before `PreSubmit` has assigned it a `seq`
/// or derived `is_last_submission`/`has_external_fence`.
pub struct SubmissionRequest {
    pub wait: Vec<SemaphoreInfo>,
    pub cbs: Vec<CommandBufferSubmission>,
    pub signal: Vec<SemaphoreInfo>,
    pub fence: Option<SemaphoreInfo>,
    pub fence_is_external: bool,
    pub perf_pass: Option<u64>,
    pub loc: &'static str,
    /// Set when this submission includes a present operation, naming the
    /// swapchain it presents to; used by `UpdatePresentOnlyQueueProgress`.
    pub present_swapchain: Option<u64>,
}

/// One submission batch as recorded at `PreSubmit` time.
pub struct Submission {
    pub seq: u64,
    pub wait: Vec<SemaphoreInfo>,
    pub cbs: Vec<CommandBufferSubmission>,
    pub signal: Vec<SemaphoreInfo>,
    pub fence: Option<SemaphoreInfo>,
    pub perf_pass: Option<u64>,
    /// Caller-supplied label for diagnostics (source location of the
    /// submitting call), not used for any semantic decision.
    pub loc: &'static str,
    pub is_last_submission: bool,
    pub has_external_fence: bool,
    pub completed: Arc<Completion>,
}

impl Submission {
    pub fn waiter(&self) -> Arc<Completion> {
        Arc::clone(&self.completed)
    }
}
