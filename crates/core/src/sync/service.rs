//! Wires the scheduler, the execution queue and the orchestrator together.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::queue::{Admission, ExecutionQueue, JobRequest, QueueStatus, RunKind};
use crate::scheduler::{scheduled_job, JobKey, ScheduledJob, Scheduler, SchedulerError, TokioScheduler};

use super::orchestrator::SyncOrchestrator;
use super::types::SyncReport;

/// Snapshot of the service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    /// Whether the fixed-rate run is registered.
    pub scheduled: bool,
    pub queue: QueueStatus,
    pub last_report: Option<SyncReport>,
}

/// Runs sync on a fixed schedule and on demand, one run at a time.
pub struct SyncService {
    orchestrator: Arc<SyncOrchestrator>,
    queue: ExecutionQueue,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    scheduled_key: Mutex<Option<JobKey>>,
    last_report: Arc<RwLock<Option<SyncReport>>>,
}

impl SyncService {
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        let interval = Duration::from_secs(orchestrator.config().interval_secs);
        Self {
            orchestrator: Arc::new(orchestrator),
            queue: ExecutionQueue::new(),
            scheduler: Arc::new(TokioScheduler::new()),
            interval,
            scheduled_key: Mutex::new(None),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the default [`TokioScheduler`].
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    /// Register the periodic scheduled run. The first run fires right away.
    pub fn start(&self) -> Result<JobKey, SchedulerError> {
        let mut slot = self
            .scheduled_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = slot.as_ref() {
            warn!(key = %key, "Sync service already started");
            return Ok(key.clone());
        }

        let key = self
            .scheduler
            .schedule_at_fixed_rate(self.submit_job(RunKind::Scheduled), self.interval)?;
        info!(
            key = %key,
            interval_secs = self.interval.as_secs(),
            "Sync service started"
        );
        *slot = Some(key.clone());
        Ok(key)
    }

    /// Request an assets-only run, as after a push notification.
    pub fn trigger_push(&self) -> Result<(), SchedulerError> {
        debug!("Push run requested");
        self.scheduler
            .schedule_for_immediate_execution(self.submit_job(RunKind::Push))
    }

    /// Request a full run (metadata and assets) outside the schedule.
    pub fn trigger_scheduled(&self) -> Result<(), SchedulerError> {
        debug!("Manual scheduled run requested");
        self.scheduler
            .schedule_for_immediate_execution(self.submit_job(RunKind::Scheduled))
    }

    /// Stop all future firings. A run in progress finishes normally.
    pub fn shutdown(&self) {
        self.scheduled_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.scheduler.cancel_all();
        info!("Sync service stopped");
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_report
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            scheduled: self
                .scheduled_key
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some(),
            queue: self.queue.status(),
            last_report: self.last_report(),
        }
    }

    /// Job body handed to the scheduler: submit a run and, when granted,
    /// execute it plus whatever queues up behind it.
    fn submit_job(&self, kind: RunKind) -> ScheduledJob {
        let orchestrator = Arc::clone(&self.orchestrator);
        let queue = self.queue.clone();
        let last_report = Arc::clone(&self.last_report);

        scheduled_job(move || {
            let orchestrator = Arc::clone(&orchestrator);
            let queue = queue.clone();
            let last_report = Arc::clone(&last_report);

            async move {
                let request = JobRequest::new(kind, move |kind| async move {
                    let report = orchestrator.run(kind).await;
                    *last_report.write().unwrap_or_else(PoisonError::into_inner) = Some(report);
                });

                match queue.submit(request) {
                    Admission::Granted(handle) => handle.run().await,
                    Admission::Queued => debug!(kind = %kind, "Run queued"),
                    Admission::Coalesced => debug!(kind = %kind, "Run coalesced"),
                }
                Ok(())
            }
        })
    }
}
