//! Single-flight execution queue for sync runs.

mod executor;
mod types;

pub use executor::{Admission, ExecutionQueue, RunHandle};
pub use types::{JobOutcome, JobRequest, QueueStatus, RunKind};
