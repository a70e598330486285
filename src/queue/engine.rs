//! The submission queue: ordered enqueue, a dedicated per-queue retire
//! worker, and the host-visible wait/notify/progress operations built on it.

use std::any::TypeId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};

use crate::config::QueueConfig;
use crate::error::CoreError;
use crate::{FastHashMap, FastHashSet};

use super::submission::{
    CommandBufferSubmission, Completion, Semaphore, SemaphoreInfo, SemaphorePayload, Submission, SubmissionRequest,
};

/// Per-queue hook a higher layer registers to track its own bookkeeping
/// (e.g. resource lifetimes) through a submission's lifecycle. Default
/// methods are no-ops so an implementer overrides only what it needs.
pub trait SubState: Send {
    fn pre_submit(&mut self, _requests: &mut [SubmissionRequest]) {}
    fn post_submit(&mut self, _submission: &Submission) {}
    fn retire(&mut self, _submission: &Submission) {}

    /// Called once per command buffer (every linked secondary, then the
    /// primary) while retiring a submission. `perf_pass` is the submission's
    /// performance query pass index, if any. `is_referenced_after` answers
    /// whether `command_buffer_id` is also recorded in some later, still
    /// in-flight submission on this queue — the question a performance
    /// query needs answered before it can safely report its result.
    fn retire_command_buffer(
        &mut self,
        _command_buffer_id: u64,
        _perf_pass: Option<u64>,
        _is_referenced_after: &dyn Fn(u64) -> bool,
    ) {
    }

    fn destroy(&mut self) {}
}

/// Callback the core queries for a present-only queue's outstanding-present
/// heuristic, since swapchain image counts are owned by the caller.
pub trait SwapchainImageCounts {
    fn image_count(&self, swapchain_id: u64) -> Option<u32>;
}

#[derive(Clone, Copy, Debug)]
struct PresentSubmission {
    seq: u64,
    swapchain_id: u64,
}

pub struct PreSubmitResult {
    pub submission_seq: Vec<u64>,
}

struct QueueState {
    submissions: VecDeque<Arc<Submission>>,
    request_seq: u64,
    exit_flag: bool,
    worker: Option<JoinHandle<()>>,
    present_submissions: Vec<PresentSubmission>,
}

/// Host-side bookkeeping for one GPU queue: ordered submissions, a dedicated
/// retire worker, and semaphore/fence coordination. `pre_submit` is only
/// ever called from one thread at a time per the GPU-API's external
/// synchronization rule; `wait`/`notify`/sub-state reads may run
/// concurrently with it from other threads.
pub struct Queue {
    id: u64,
    seq: AtomicU64,
    state: Mutex<QueueState>,
    cond: Condvar,
    sub_states: Mutex<IndexMap<TypeId, Box<dyn SubState>>>,
    config: QueueConfig,
}

impl Queue {
    pub fn new(id: u64, config: QueueConfig) -> Arc<Self> {
        Arc::new(Queue {
            id,
            seq: AtomicU64::new(0),
            state: Mutex::new(QueueState {
                submissions: VecDeque::new(),
                request_seq: 0,
                exit_flag: false,
                worker: None,
                present_submissions: Vec::new(),
            }),
            cond: Condvar::new(),
            sub_states: Mutex::new(IndexMap::new()),
            config,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    pub fn register_sub_state<S: SubState + 'static>(&self, state: S) {
        self.sub_states.lock().insert(TypeId::of::<S>(), Box::new(state));
    }

    /// Runs every sub-state's `pre_submit` over the still-unsequenced
    /// batch, then assigns `seq` to each request in order, records
    /// semaphore/fence enqueue operations, and appends the finalized
    /// submissions to the queue. Lazily starts the worker thread on the
    /// first submission ever made on this queue.
    pub fn pre_submit(self: &Arc<Self>, mut requests: Vec<SubmissionRequest>) -> Result<PreSubmitResult, CoreError> {
        if requests.is_empty() {
            return Ok(PreSubmitResult { submission_seq: Vec::new() });
        }
        let last_index = requests.len() - 1;

        {
            let mut sub_states = self.sub_states.lock();
            for s in sub_states.values_mut() {
                s.pre_submit(&mut requests);
            }
        }

        let mut state = self.state.lock();
        if state.exit_flag {
            return Err(CoreError::QueueDestroyed);
        }

        let mut seqs = Vec::with_capacity(requests.len());
        let mut finalized = Vec::with_capacity(requests.len());
        for (i, req) in requests.into_iter().enumerate() {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            for w in &req.wait {
                w.semaphore.enqueue_wait(seq, w.payload);
            }
            for s in &req.signal {
                s.semaphore.enqueue_signal(seq, s.payload);
            }
            let has_external_fence = req.fence.is_some() && req.fence_is_external;
            if let Some(f) = &req.fence {
                f.semaphore.enqueue_signal(seq, f.payload);
            }
            if let Some(swapchain_id) = req.present_swapchain {
                state.present_submissions.push(PresentSubmission { seq, swapchain_id });
            }

            seqs.push(seq);
            finalized.push(Arc::new(Submission {
                seq,
                wait: req.wait,
                cbs: req.cbs,
                signal: req.signal,
                fence: req.fence,
                perf_pass: req.perf_pass,
                loc: req.loc,
                is_last_submission: i == last_index,
                has_external_fence,
                completed: Completion::new(),
            }));
        }

        for s in &finalized {
            state.submissions.push_back(Arc::clone(s));
        }
        let should_spawn = state.worker.is_none();
        drop(state);

        if should_spawn {
            self.spawn_worker()?;
        }

        Ok(PreSubmitResult { submission_seq: seqs })
    }

    fn spawn_worker(self: &Arc<Self>) -> Result<(), CoreError> {
        let queue = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("queue-{}-worker", self.id))
            .spawn(move || queue.worker_loop())
            .map_err(|e| CoreError::WorkerSpawnFailed { message: e.to_string() })?;
        self.state.lock().worker = Some(handle);
        Ok(())
    }

    fn worker_loop(self: Arc<Self>) {
        loop {
            let submission = {
                let mut state = self.state.lock();
                loop {
                    if state.exit_flag {
                        return;
                    }
                    let ready = match state.submissions.front() {
                        Some(front) => state.request_seq >= front.seq,
                        None => false,
                    };
                    if ready {
                        break;
                    }
                    self.cond.wait(&mut state);
                }
                Arc::clone(state.submissions.front().unwrap())
            };

            profiling::scope!("Queue::worker_loop retire");
            self.retire(&submission);

            let mut state = self.state.lock();
            state.submissions.pop_front();
            state.present_submissions.retain(|p| p.seq != submission.seq);
            drop(state);
            submission.completed.fulfill();
        }
    }

    fn retire(&self, submission: &Submission) {
        {
            let mut sub_states = self.sub_states.lock();
            for s in sub_states.values_mut() {
                s.retire(submission);
            }
        }
        self.retire_command_buffers(submission);
        for w in &submission.wait {
            w.semaphore.retire_wait(submission.seq);
        }
        for s in &submission.signal {
            s.semaphore.retire_signal(submission.seq);
        }
        if let Some(f) = &submission.fence {
            f.semaphore.retire_signal(submission.seq);
        }
        crate::log_diag!("queue {} retired submission {}", self.id, submission.seq);
    }

    /// Snapshots which command-buffer ids still appear in a later, not yet
    /// retired submission, then calls every sub-state's
    /// `retire_command_buffer` for each linked secondary and the primary.
    /// The snapshot is taken under the queue lock and released before
    /// `sub_states` is locked, so the two locks are never held together.
    fn retire_command_buffers(&self, submission: &Submission) {
        let later_cb_ids: FastHashSet<u64> = {
            let state = self.state.lock();
            state
                .submissions
                .iter()
                .filter(|s| s.seq > submission.seq)
                .flat_map(|s| s.cbs.iter())
                .flat_map(|cb| std::iter::once(cb.command_buffer_id).chain(cb.secondary_ids.iter().copied()))
                .collect()
        };
        let is_referenced_after = |cb_id: u64| later_cb_ids.contains(&cb_id);

        let mut sub_states = self.sub_states.lock();
        for cb in &submission.cbs {
            for &secondary_id in &cb.secondary_ids {
                for s in sub_states.values_mut() {
                    s.retire_command_buffer(secondary_id, submission.perf_pass, &is_referenced_after);
                }
            }
            for s in sub_states.values_mut() {
                s.retire_command_buffer(cb.command_buffer_id, submission.perf_pass, &is_referenced_after);
            }
        }
    }

    /// Invoked by the caller once the device-level submit call has
    /// returned. Runs every sub-state's `post_submit`, then resolves any
    /// externally-signaled fence immediately rather than waiting for the
    /// worker's normal retire pass.
    pub fn post_submit(&self, submission: &Submission) {
        {
            let mut sub_states = self.sub_states.lock();
            for s in sub_states.values_mut() {
                s.post_submit(submission);
            }
        }
        if submission.has_external_fence {
            self.notify_and_wait(submission.loc, Some(submission.seq));
        }
    }

    /// Raises `request_seq` to at most `until_seq` (current seq if `None`)
    /// and wakes the worker.
    pub fn notify(&self, until_seq: Option<u64>) {
        let target = until_seq.unwrap_or_else(|| self.current_seq());
        let mut state = self.state.lock();
        if target > state.request_seq {
            state.request_seq = target;
        }
        self.cond.notify_all();
    }

    /// Waits for the submission with `until_seq` (current seq if `None`) to
    /// be retired, up to the configured timeout. Returns immediately if the
    /// target was already retired or never submitted.
    pub fn wait(&self, loc: &str, until_seq: Option<u64>) {
        let target = until_seq.unwrap_or_else(|| self.current_seq());
        let waiter = {
            let state = self.state.lock();
            state.submissions.iter().find(|s| s.seq == target).map(|s| s.waiter())
        };
        let Some(waiter) = waiter else {
            return;
        };
        if !waiter.wait_timeout(self.config.cond_wait_timeout) {
            log::warn!(
                "queue {} wait at {} for seq {} timed out after {:?}",
                self.id,
                loc,
                target,
                self.config.cond_wait_timeout
            );
        }
    }

    pub fn notify_and_wait(&self, loc: &str, until_seq: Option<u64>) {
        self.notify(until_seq);
        self.wait(loc, until_seq);
    }

    /// Earliest timeline-semaphore wait at-or-before `until_seq` with no
    /// resolving signal anywhere. Two-phase to respect the Queue-then-
    /// Semaphore lock order: phase 1 snapshots waits under the queue lock,
    /// phase 2 queries each semaphore after releasing it.
    pub fn find_timeline_wait_without_resolving_signal(&self, until_seq: u64) -> Option<(u64, SemaphorePayload)> {
        let mut candidates: Vec<(Arc<Semaphore>, SemaphorePayload, u64)> = Vec::new();
        {
            let state = self.state.lock();
            for submission in state.submissions.iter().filter(|s| s.seq <= until_seq) {
                for w in &submission.wait {
                    if w.semaphore.timeline {
                        candidates.push((Arc::clone(&w.semaphore), w.payload, submission.seq));
                    }
                }
            }
        }

        candidates
            .into_iter()
            .filter(|(sem, payload, _)| !sem.has_resolving_signal(*payload))
            .min_by_key(|(_, _, seq)| *seq)
            .map(|(_, payload, seq)| (seq, payload))
    }

    /// Heuristic progress notification for a queue used only for present:
    /// if any swapchain has more outstanding present submissions than it
    /// has images, the oldest such submission must have completed on an
    /// error-free program, so notify progress up to it.
    pub fn update_present_only_queue_progress(&self, counts: &dyn SwapchainImageCounts) {
        let stale_seq = {
            let state = self.state.lock();
            let mut by_swapchain: FastHashMap<u64, Vec<u64>> = FastHashMap::default();
            for p in &state.present_submissions {
                by_swapchain.entry(p.swapchain_id).or_default().push(p.seq);
            }
            let mut oldest_over_capacity: Option<u64> = None;
            for (swapchain_id, mut seqs) in by_swapchain {
                let Some(image_count) = counts.image_count(swapchain_id) else {
                    continue;
                };
                if seqs.len() as u32 > image_count {
                    seqs.sort_unstable();
                    let oldest = seqs[0];
                    oldest_over_capacity =
                        Some(oldest_over_capacity.map_or(oldest, |cur: u64| cur.min(oldest)));
                }
            }
            oldest_over_capacity
        };
        if let Some(seq) = stale_seq {
            crate::log_diag!("queue {} present-only progress heuristic notifying up to seq {}", self.id, seq);
            self.notify(Some(seq));
        }
    }

    /// Sets the exit flag, wakes the worker, and joins it, then destroys
    /// every registered sub-state. Safe to call at most once.
    pub fn destroy(&self) {
        let worker = {
            let mut state = self.state.lock();
            state.exit_flag = true;
            self.cond.notify_all();
            state.worker.take()
        };
        if let Some(handle) = worker {
            let _ = handle.join();
        }
        let mut sub_states = self.sub_states.lock();
        for s in sub_states.values_mut() {
            s.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(loc: &'static str) -> SubmissionRequest {
        SubmissionRequest {
            wait: Vec::new(),
            cbs: Vec::new(),
            signal: Vec::new(),
            fence: None,
            fence_is_external: false,
            perf_pass: None,
            loc,
            present_swapchain: None,
        }
    }

    #[test]
    fn queue_orders_submissions_and_retires_in_order() {
        let queue = Queue::new(1, QueueConfig::default());
        let r1 = queue.pre_submit(vec![request("a")]).unwrap();
        let r2 = queue.pre_submit(vec![request("b")]).unwrap();
        assert_eq!(r1.submission_seq, vec![1]);
        assert_eq!(r2.submission_seq, vec![2]);

        queue.notify(Some(1));
        queue.wait("test", Some(1));
        queue.notify(Some(2));
        queue.wait("test", Some(2));

        queue.destroy();
    }

    #[test]
    fn wait_on_unsubmitted_seq_returns_immediately() {
        let queue = Queue::new(1, QueueConfig::default());
        queue.wait("test", Some(99));
        queue.destroy();
    }

    #[test]
    fn sub_state_retire_runs_in_order() {
        struct Tracker(Arc<Mutex<Vec<u64>>>);
        impl SubState for Tracker {
            fn retire(&mut self, submission: &Submission) {
                self.0.lock().push(submission.seq);
            }
        }

        let queue = Queue::new(1, QueueConfig::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        queue.register_sub_state(Tracker(Arc::clone(&log)));

        queue.pre_submit(vec![request("a"), request("b")]).unwrap();
        queue.notify(None);
        queue.wait("test", Some(2));
        queue.destroy();

        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[test]
    fn command_buffer_retire_reports_later_reference() {
        let _ = env_logger::try_init();

        struct Recorder(Arc<Mutex<Vec<(u64, bool)>>>);
        impl SubState for Recorder {
            fn retire_command_buffer(
                &mut self,
                command_buffer_id: u64,
                _perf_pass: Option<u64>,
                is_referenced_after: &dyn Fn(u64) -> bool,
            ) {
                self.0.lock().push((command_buffer_id, is_referenced_after(command_buffer_id)));
            }
        }

        let queue = Queue::new(1, QueueConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        queue.register_sub_state(Recorder(Arc::clone(&seen)));

        let mut r1 = request("a");
        r1.cbs.push(CommandBufferSubmission { command_buffer_id: 100, secondary_ids: Default::default() });
        let mut r2 = request("b");
        r2.cbs.push(CommandBufferSubmission { command_buffer_id: 100, secondary_ids: Default::default() });
        queue.pre_submit(vec![r1]).unwrap();
        queue.pre_submit(vec![r2]).unwrap();

        queue.notify(Some(1));
        queue.wait("test", Some(1));
        queue.notify(Some(2));
        queue.wait("test", Some(2));
        queue.destroy();

        let seen = seen.lock();
        assert_eq!(*seen, vec![(100, true), (100, false)]);
    }

    #[test]
    fn find_timeline_wait_without_resolving_signal() {
        let queue = Queue::new(1, QueueConfig::default());
        let sem = Semaphore::new(7, true);
        let mut req = request("a");
        req.wait.push(SemaphoreInfo { semaphore: Arc::clone(&sem), payload: SemaphorePayload(5) });
        let result = queue.pre_submit(vec![req]).unwrap();
        let seq = result.submission_seq[0];

        let found = queue.find_timeline_wait_without_resolving_signal(seq);
        assert_eq!(found, Some((seq, SemaphorePayload(5))));

        sem.enqueue_signal(seq, SemaphorePayload(5));
        let found = queue.find_timeline_wait_without_resolving_signal(seq);
        assert_eq!(found, None);

        queue.notify(Some(seq));
        queue.wait("test", Some(seq));
        queue.destroy();
    }

    #[test]
    fn present_only_progress_notifies_oldest_when_over_capacity() {
        struct OneImage;
        impl SwapchainImageCounts for OneImage {
            fn image_count(&self, _swapchain_id: u64) -> Option<u32> {
                Some(1)
            }
        }

        let queue = Queue::new(1, QueueConfig::default());
        let mut r1 = request("present-1");
        r1.present_swapchain = Some(42);
        let mut r2 = request("present-2");
        r2.present_swapchain = Some(42);
        queue.pre_submit(vec![r1]).unwrap();
        queue.pre_submit(vec![r2]).unwrap();

        queue.update_present_only_queue_progress(&OneImage);
        queue.wait("test", Some(1));
        queue.destroy();
    }
}
