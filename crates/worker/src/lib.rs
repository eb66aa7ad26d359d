//! Background asset processing.
//!
//! - [`JobQueue`]: the volatile job table plus enqueue / read / status-update
//!   operations.
//! - [`WorkerPool`]: FIFO executor that never runs more than a fixed number of
//!   tasks at once.
//! - [`JobProcessor`]: per-job-type recipes that run the external conversion
//!   programs and record the outcome on the job.
//! - [`ProcessingService`]: wires the three together for the API layer.

pub mod pool;
pub mod processor;
pub mod queue;
pub mod service;

pub use pool::WorkerPool;
pub use processor::{JobFailure, JobProcessor, ProcessorConfig};
pub use queue::JobQueue;
pub use service::ProcessingService;
