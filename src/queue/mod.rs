//! Submission queue: ordered command-buffer batches, semaphore/fence
//! coordination, and a dedicated per-queue retire worker.

mod engine;
mod submission;

pub use engine::{PreSubmitResult, Queue, SubState, SwapchainImageCounts};
pub use submission::{
    CommandBufferSubmission, Completion, Semaphore, SemaphoreInfo, SemaphorePayload, Submission, SubmissionRequest,
};
