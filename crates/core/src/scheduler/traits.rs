use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

/// A repeatable job body. Each firing calls it once and awaits the future.
pub type ScheduledJob = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`ScheduledJob`].
pub fn scheduled_job<F, Fut>(f: F) -> ScheduledJob
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Identifies a fixed-rate registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Could not generate a unique job key after {attempts} attempts")]
    KeyGenerationExhausted { attempts: u32 },

    #[error("Scheduler has been shut down")]
    ShutDown,

    #[error("Period must be greater than zero")]
    InvalidPeriod,

    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Fires jobs periodically or once, right away.
///
/// Implementations hold no business logic; errors and panics from job bodies
/// are logged and never reach the caller.
pub trait Scheduler: Send + Sync {
    /// Run `job` now and then every `period` until stopped.
    fn schedule_at_fixed_rate(
        &self,
        job: ScheduledJob,
        period: Duration,
    ) -> Result<JobKey, SchedulerError>;

    /// Stop a fixed-rate registration. Returns false for unknown keys.
    /// A firing that already started is not interrupted.
    fn stop(&self, key: &JobKey) -> bool;

    /// Run `job` once, as soon as possible.
    fn schedule_for_immediate_execution(&self, job: ScheduledJob) -> Result<(), SchedulerError>;

    /// Stop every registration and refuse new ones.
    fn cancel_all(&self);
}
