//! Tokio timer based scheduler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::traits::{JobKey, ScheduledJob, Scheduler, SchedulerError};

/// Attempts at finding an unused key before giving up.
const MAX_KEY_ATTEMPTS: u32 = 16;

type KeyGenerator = Box<dyn Fn() -> JobKey + Send + Sync>;

/// Scheduler running one timer task per registration.
///
/// Every firing spawns the job body on its own task, so a slow body never
/// delays the timer and stopping a registration never aborts a running body.
pub struct TokioScheduler {
    timers: Mutex<HashMap<JobKey, JoinHandle<()>>>,
    shut_down: AtomicBool,
    key_generator: KeyGenerator,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::with_key_generator(|| JobKey::new(uuid::Uuid::new_v4().to_string()))
    }

    pub fn with_key_generator<G>(generator: G) -> Self
    where
        G: Fn() -> JobKey + Send + Sync + 'static,
    {
        Self {
            timers: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
            key_generator: Box::new(generator),
        }
    }

    /// Number of active fixed-rate registrations.
    pub fn active_count(&self) -> usize {
        self.timers().len()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<JobKey, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime() -> Result<Handle, SchedulerError> {
        Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))
    }

    fn unique_key(
        &self,
        timers: &HashMap<JobKey, JoinHandle<()>>,
    ) -> Result<JobKey, SchedulerError> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = (self.key_generator)();
            if !timers.contains_key(&key) {
                return Ok(key);
            }
            debug!(key = %key, "Generated job key already in use, regenerating");
        }
        Err(SchedulerError::KeyGenerationExhausted {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn one firing plus a task that reports how it ended.
fn fire(runtime: &Handle, label: String, job: &ScheduledJob) {
    let task = runtime.spawn(job());
    runtime.spawn(async move {
        match task.await {
            Ok(Ok(())) => debug!(job = %label, "Job finished"),
            Ok(Err(e)) => error!(job = %label, error = %e, "Job failed"),
            Err(e) if e.is_panic() => error!(job = %label, "Job panicked"),
            Err(_) => debug!(job = %label, "Job cancelled"),
        }
    });
}

impl Scheduler for TokioScheduler {
    fn schedule_at_fixed_rate(
        &self,
        job: ScheduledJob,
        period: Duration,
    ) -> Result<JobKey, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::InvalidPeriod);
        }
        let runtime = Self::runtime()?;

        let mut timers = self.timers();
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShutDown);
        }
        let key = self.unique_key(&timers)?;

        let label = key.to_string();
        let spawner = runtime.clone();
        let timer = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                fire(&spawner, label.clone(), &job);
            }
        });

        info!(key = %key, period_secs = period.as_secs_f64(), "Registered fixed-rate job");
        timers.insert(key.clone(), timer);
        Ok(key)
    }

    fn stop(&self, key: &JobKey) -> bool {
        match self.timers().remove(key) {
            Some(timer) => {
                timer.abort();
                info!(key = %key, "Stopped fixed-rate job");
                true
            }
            None => false,
        }
    }

    fn schedule_for_immediate_execution(&self, job: ScheduledJob) -> Result<(), SchedulerError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShutDown);
        }
        let runtime = Self::runtime()?;
        fire(&runtime, "immediate".to_string(), &job);
        Ok(())
    }

    fn cancel_all(&self) {
        let mut timers = self.timers();
        self.shut_down.store(true, Ordering::SeqCst);
        let count = timers.len();
        for (_, timer) in timers.drain() {
            timer.abort();
        }
        if count > 0 {
            info!(count, "Cancelled all scheduled jobs");
        } else {
            debug!("Scheduler shut down with no active jobs");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    use tokio::sync::oneshot;

    use super::*;
    use crate::scheduler::scheduled_job;

    fn counting(counter: Arc<AtomicU32>) -> ScheduledJob {
        scheduled_job(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_fixed_rate_fires_repeatedly_until_stopped() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));

        let key = scheduler
            .schedule_at_fixed_rate(counting(counter.clone()), Duration::from_millis(10))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);

        assert!(scheduler.stop(&key));
        assert!(!scheduler.stop(&key));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_failing_job_keeps_firing() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let job = {
            let counter = counter.clone();
            scheduled_job(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::anyhow!("upstream down"))
                }
            })
        };

        scheduler
            .schedule_at_fixed_rate(job, Duration::from_millis(10))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);
        scheduler.cancel_all();
    }

    #[tokio::test]
    async fn test_immediate_execution() {
        let scheduler = TokioScheduler::new();
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let job = scheduled_job(move || {
            let tx = tx.clone();
            async move {
                if let Some(tx) = tx.lock().unwrap().take() {
                    tx.send(()).ok();
                }
                Ok(())
            }
        });
        scheduler.schedule_for_immediate_execution(job).unwrap();

        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("job did not run")
            .unwrap();
    }

    #[tokio::test]
    async fn test_key_collision_regenerates() {
        let keys = Mutex::new(vec!["b", "a", "a"]);
        let scheduler = TokioScheduler::with_key_generator(move || {
            JobKey::new(keys.lock().unwrap().pop().unwrap_or("z"))
        });
        let counter = Arc::new(AtomicU32::new(0));

        let first = scheduler
            .schedule_at_fixed_rate(counting(counter.clone()), Duration::from_secs(60))
            .unwrap();
        let second = scheduler
            .schedule_at_fixed_rate(counting(counter.clone()), Duration::from_secs(60))
            .unwrap();

        assert_eq!(first.as_str(), "a");
        assert_eq!(second.as_str(), "b");
        assert_eq!(scheduler.active_count(), 2);
        scheduler.cancel_all();
    }

    #[tokio::test]
    async fn test_key_generation_exhausted() {
        let scheduler = TokioScheduler::with_key_generator(|| JobKey::new("fixed"));
        let counter = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule_at_fixed_rate(counting(counter.clone()), Duration::from_secs(60))
            .unwrap();
        let result =
            scheduler.schedule_at_fixed_rate(counting(counter.clone()), Duration::from_secs(60));

        assert!(matches!(
            result,
            Err(SchedulerError::KeyGenerationExhausted { .. })
        ));
        assert_eq!(scheduler.active_count(), 1);
        scheduler.cancel_all();
    }

    #[tokio::test]
    async fn test_cancel_all_refuses_new_jobs() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        scheduler
            .schedule_at_fixed_rate(counting(counter.clone()), Duration::from_secs(60))
            .unwrap();

        scheduler.cancel_all();
        assert_eq!(scheduler.active_count(), 0);

        assert!(matches!(
            scheduler.schedule_at_fixed_rate(counting(counter.clone()), Duration::from_secs(60)),
            Err(SchedulerError::ShutDown)
        ));
        assert!(matches!(
            scheduler.schedule_for_immediate_execution(counting(counter)),
            Err(SchedulerError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_cancel_all_lets_running_job_finish() {
        let scheduler = TokioScheduler::new();
        let (started_tx, mut started_rx) = tokio::sync::mpsc::unbounded_channel();
        let (finished_tx, mut finished_rx) = tokio::sync::mpsc::unbounded_channel();
        let release = Arc::new(tokio::sync::Notify::new());

        let job = {
            let release = release.clone();
            scheduled_job(move || {
                let started_tx = started_tx.clone();
                let finished_tx = finished_tx.clone();
                let release = release.clone();
                async move {
                    started_tx.send(()).ok();
                    release.notified().await;
                    finished_tx.send(()).ok();
                    Ok(())
                }
            })
        };
        scheduler
            .schedule_at_fixed_rate(job, Duration::from_secs(60))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), started_rx.recv())
            .await
            .expect("first firing did not start");

        scheduler.cancel_all();
        assert_eq!(scheduler.active_count(), 0);
        release.notify_one();

        tokio::time::timeout(Duration::from_secs(1), finished_rx.recv())
            .await
            .expect("in-flight firing was interrupted")
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        assert!(matches!(
            scheduler.schedule_at_fixed_rate(counting(counter), Duration::ZERO),
            Err(SchedulerError::InvalidPeriod)
        ));
    }
}
