use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tracing::{debug, error, warn};

use super::types::{JobOutcome, JobRequest, QueueStatus};
use crate::metrics;

#[derive(Debug, Default)]
struct QueueState {
    running: bool,
    pending: Option<JobRequest>,
    executed: u64,
    coalesced: u64,
}

/// Result of [`ExecutionQueue::submit`].
pub enum Admission {
    /// The queue was idle; run the handle to execute the job.
    Granted(RunHandle),
    /// A run is active; the request now occupies the pending slot.
    Queued,
    /// A run is active and one is already pending; the request was folded in.
    Coalesced,
}

impl fmt::Debug for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted(_) => f.write_str("Granted"),
            Self::Queued => f.write_str("Queued"),
            Self::Coalesced => f.write_str("Coalesced"),
        }
    }
}

/// Single-flight queue: at most one job runs, at most one waits.
///
/// Requests arriving while a job runs and another already waits are merged
/// into the waiting one. The first waiting request keeps its body and
/// callback; later ones only widen its [`super::RunKind`] and get
/// [`JobOutcome::Coalesced`] right away.
#[derive(Clone, Default)]
pub struct ExecutionQueue {
    state: Arc<Mutex<QueueState>>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn submit(&self, request: JobRequest) -> Admission {
        let mut state = self.lock();

        if !state.running {
            state.running = true;
            drop(state);
            debug!(kind = %request.kind, "Run granted");
            metrics::QUEUE_REQUESTS.with_label_values(&["granted"]).inc();
            return Admission::Granted(RunHandle::new(self.clone(), request));
        }

        let merged = match state.pending.as_mut() {
            Some(pending) => {
                pending.kind = pending.kind.merge(request.kind);
                pending.kind
            }
            None => {
                debug!(kind = %request.kind, "Run queued behind active run");
                state.pending = Some(request);
                metrics::QUEUE_REQUESTS.with_label_values(&["queued"]).inc();
                return Admission::Queued;
            }
        };
        state.coalesced += 1;
        drop(state);

        debug!(kind = %request.kind, pending = %merged, "Run coalesced into pending slot");
        metrics::QUEUE_REQUESTS.with_label_values(&["coalesced"]).inc();
        if let Some(callback) = request.on_complete {
            callback(JobOutcome::Coalesced);
        }
        Admission::Coalesced
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.lock();
        QueueStatus {
            running: state.running,
            pending: state.pending.as_ref().map(|r| r.kind),
            executed: state.executed,
            coalesced: state.coalesced,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Take the pending request, or go idle when there is none.
    fn next_or_idle(&self) -> Option<JobRequest> {
        let mut state = self.lock();
        let next = state.pending.take();
        if next.is_none() {
            state.running = false;
        }
        next
    }

    fn release(&self) {
        let mut state = self.lock();
        state.running = false;
        if let Some(dropped) = state.pending.take() {
            warn!(kind = %dropped.kind, "Dropping pending run, no runtime to execute it");
        }
    }

    async fn execute(&self, request: JobRequest) {
        let JobRequest {
            kind,
            body,
            on_complete,
        } = request;

        debug!(kind = %kind, "Executing run");
        let result = AssertUnwindSafe(async move { body(kind).await })
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(()) => JobOutcome::Executed(kind),
            Err(_) => {
                error!(kind = %kind, "Run panicked");
                JobOutcome::Panicked(kind)
            }
        };

        self.lock().executed += 1;

        if let Some(callback) = on_complete {
            callback(outcome);
        }
    }
}

impl fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionQueue")
            .field("status", &self.status())
            .finish()
    }
}

/// Exclusive right to run jobs until the queue drains.
///
/// Dropping an unfinished handle hands any remaining work to a new task on the
/// current tokio runtime, so the queue never stays stuck in the running state.
pub struct RunHandle {
    queue: ExecutionQueue,
    current: Option<JobRequest>,
    finished: bool,
}

impl RunHandle {
    fn new(queue: ExecutionQueue, request: JobRequest) -> Self {
        Self {
            queue,
            current: Some(request),
            finished: false,
        }
    }

    /// Run the granted job, then every pending one, then go idle.
    pub async fn run(mut self) {
        let mut next = self.current.take();
        while let Some(request) = next {
            self.queue.execute(request).await;
            next = self.queue.next_or_idle();
        }
        self.finished = true;
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let remaining = match self.current.take() {
            Some(request) => Some(request),
            None => self.queue.next_or_idle(),
        };
        let Some(request) = remaining else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(kind = %request.kind, "Run handle dropped early, continuing on a new task");
                let handle = RunHandle::new(self.queue.clone(), request);
                runtime.spawn(handle.run());
            }
            Err(_) => {
                warn!(kind = %request.kind, "Run handle dropped outside a runtime, releasing queue");
                self.queue.release();
            }
        }
    }
}
