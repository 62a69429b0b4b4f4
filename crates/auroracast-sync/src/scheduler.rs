//! Background task registration and invocation.
//!
//! The host (an OS scheduler, or [`LocalTimerHost`] on desktop) decides when
//! to run; [`BackgroundTask`] makes sure every run reports completion back to
//! the host, whatever happens inside the job.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auroracast_core::{SyncConfig, MIN_SYNC_INTERVAL_MINUTES};
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::routine::SyncReport;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationReason {
    /// App process alive, host timer fired
    Periodic,
    /// Process was started by the host only to run this task
    Headless,
}

impl fmt::Display for InvocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic => write!(f, "periodic"),
            Self::Headless => write!(f, "headless"),
        }
    }
}

/// Context of a single run
#[derive(Debug, Clone)]
pub struct SyncInvocation {
    /// Process-wide, strictly increasing
    pub id: u64,
    pub reason: InvocationReason,
    pub budget: Duration,
}

impl SyncInvocation {
    pub fn new(reason: InvocationReason, budget: Duration) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            reason,
            budget,
        }
    }
}

/// What the task asks of the host scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerRegistration {
    pub minimum_interval_minutes: u32,
    pub requires_network: bool,
    pub survives_reboot: bool,
    pub allow_headless: bool,
}

impl SchedulerRegistration {
    /// Intervals below the platform minimum are raised to it.
    pub fn new(
        minimum_interval_minutes: u32,
        requires_network: bool,
        survives_reboot: bool,
        allow_headless: bool,
    ) -> Self {
        let minutes = if minimum_interval_minutes < MIN_SYNC_INTERVAL_MINUTES {
            warn!(
                requested = minimum_interval_minutes,
                minimum = MIN_SYNC_INTERVAL_MINUTES,
                "Sync interval below platform minimum, raising it"
            );
            MIN_SYNC_INTERVAL_MINUTES
        } else {
            minimum_interval_minutes
        };

        Self {
            minimum_interval_minutes: minutes,
            requires_network,
            survives_reboot,
            allow_headless,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.minimum_interval_minutes) * 60)
    }
}

impl From<&SyncConfig> for SchedulerRegistration {
    fn from(config: &SyncConfig) -> Self {
        Self::new(
            config.minimum_interval_minutes,
            config.requires_network,
            config.survives_reboot,
            config.allow_headless,
        )
    }
}

/// The host-side scheduler
pub trait HostScheduler: Send + Sync {
    fn register(&self, registration: &SchedulerRegistration) -> SyncResult<()>;

    /// Tell the host the run with `task_id` is over.
    fn finish(&self, task_id: u64);
}

/// Work run on each invocation
#[async_trait]
pub trait SyncJob: Send + Sync {
    async fn run(&self, invocation: &SyncInvocation) -> SyncResult<SyncReport>;
}

/// Registered sync task: runs the job within its budget and always finishes.
pub struct BackgroundTask {
    job: Arc<dyn SyncJob>,
    host: Arc<dyn HostScheduler>,
    budget: Duration,
}

impl BackgroundTask {
    pub fn new(job: Arc<dyn SyncJob>, host: Arc<dyn HostScheduler>, budget: Duration) -> Self {
        Self { job, host, budget }
    }

    pub fn register(&self, registration: &SchedulerRegistration) -> SyncResult<()> {
        self.host.register(registration)?;
        info!(
            interval_minutes = registration.minimum_interval_minutes,
            headless = registration.allow_headless,
            "Background sync registered"
        );
        Ok(())
    }

    /// Run once.
    ///
    /// The job runs on its own tokio task so a panic is contained, and is
    /// aborted once the budget is spent. `finish` is called on the host in
    /// every case before returning.
    pub async fn invoke(&self, reason: InvocationReason) -> SyncResult<SyncReport> {
        let invocation = SyncInvocation::new(reason, self.budget);
        let task_id = invocation.id;
        debug!(task_id, %reason, "Sync invocation started");

        let job = Arc::clone(&self.job);
        let run = invocation.clone();
        let mut handle = tokio::spawn(async move { job.run(&run).await });

        let result = match tokio::time::timeout(self.budget, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(SyncError::Panicked(join_err.to_string())),
            Err(_) => {
                handle.abort();
                Err(SyncError::Overrun {
                    seconds: self.budget.as_secs(),
                })
            }
        };

        match &result {
            Ok(report) if report.has_failures() => {
                warn!(task_id, %reason, ?report, "Sync finished with failed steps")
            }
            Ok(_) => info!(task_id, %reason, "Sync finished"),
            Err(e) => error!(task_id, %reason, error = %e, "Sync failed"),
        }

        self.host.finish(task_id);
        result
    }
}

/// Headless entry: the host started the process only for this run.
pub async fn run_headless(task: &BackgroundTask) -> SyncResult<SyncReport> {
    task.invoke(InvocationReason::Headless).await
}

/// In-process host driven by a tokio interval
#[derive(Debug, Default)]
pub struct LocalTimerHost {
    registrations: Mutex<Vec<SchedulerRegistration>>,
    finished: Mutex<Vec<u64>>,
    cancel: CancellationToken,
}

impl LocalTimerHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancelling this token stops [`LocalTimerHost::run`] after the current invocation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registrations(&self) -> Vec<SchedulerRegistration> {
        self.registrations.lock().clone()
    }

    pub fn finished(&self) -> Vec<u64> {
        self.finished.lock().clone()
    }

    /// Invoke `task` on the registered interval until cancelled.
    ///
    /// The first invocation happens immediately. Invocations never overlap;
    /// ticks missed during a long run are delayed, not burst.
    pub async fn run(&self, task: &BackgroundTask) -> SyncResult<()> {
        let interval = self
            .registrations
            .lock()
            .last()
            .map(SchedulerRegistration::interval)
            .ok_or_else(|| SyncError::Host("no sync task registered".into()))?;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "Local sync timer started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Local sync timer cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    // outcome already logged and reported to the host
                    let _ = task.invoke(InvocationReason::Periodic).await;
                }
            }
        }
        Ok(())
    }
}

impl HostScheduler for LocalTimerHost {
    fn register(&self, registration: &SchedulerRegistration) -> SyncResult<()> {
        self.registrations.lock().push(registration.clone());
        Ok(())
    }

    fn finish(&self, task_id: u64) {
        self.finished.lock().push(task_id);
    }
}
