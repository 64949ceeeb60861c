use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// What a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Periodic run: metadata phase, then assets.
    Scheduled,
    /// Push-triggered run: assets only.
    Push,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Push => "push",
        }
    }

    pub fn includes_metadata(&self) -> bool {
        matches!(self, Self::Scheduled)
    }

    /// Kind of a pending run after another request was folded into it.
    ///
    /// A scheduled run covers everything a push run does, so it wins.
    pub fn merge(self, other: RunKind) -> RunKind {
        if self == Self::Scheduled || other == Self::Scheduled {
            Self::Scheduled
        } else {
            Self::Push
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a submitted request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The body ran to completion with the given (possibly merged) kind.
    Executed(RunKind),
    /// The body panicked; the queue moved on.
    Panicked(RunKind),
    /// The request was folded into an already pending run and never executed.
    Coalesced,
}

pub(crate) type JobBody = Box<dyn FnOnce(RunKind) -> BoxFuture<'static, ()> + Send>;
pub(crate) type CompletionCallback = Box<dyn FnOnce(JobOutcome) + Send>;

/// A request to run a job through the [`super::ExecutionQueue`].
pub struct JobRequest {
    pub(crate) kind: RunKind,
    pub(crate) body: JobBody,
    pub(crate) on_complete: Option<CompletionCallback>,
}

impl JobRequest {
    /// The body receives the kind it finally runs as, which can differ from
    /// `kind` when requests were coalesced.
    pub fn new<F, Fut>(kind: RunKind, body: F) -> Self
    where
        F: FnOnce(RunKind) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            kind,
            body: Box::new(move |kind| Box::pin(body(kind))),
            on_complete: None,
        }
    }

    pub fn with_completion<C>(mut self, callback: C) -> Self
    where
        C: FnOnce(JobOutcome) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }
}

impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRequest")
            .field("kind", &self.kind)
            .field("has_completion", &self.on_complete.is_some())
            .finish()
    }
}

/// Snapshot of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub running: bool,
    /// Kind of the waiting run, if one is pending.
    pub pending: Option<RunKind>,
    pub executed: u64,
    pub coalesced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_scheduled() {
        assert_eq!(RunKind::Push.merge(RunKind::Push), RunKind::Push);
        assert_eq!(RunKind::Push.merge(RunKind::Scheduled), RunKind::Scheduled);
        assert_eq!(RunKind::Scheduled.merge(RunKind::Push), RunKind::Scheduled);
    }

    #[test]
    fn test_includes_metadata() {
        assert!(RunKind::Scheduled.includes_metadata());
        assert!(!RunKind::Push.includes_metadata());
    }

    #[test]
    fn test_serialize_kind() {
        assert_eq!(serde_json::to_string(&RunKind::Push).unwrap(), "\"push\"");
    }
}
