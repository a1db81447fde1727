//! Recurring job driver.
//!
//! A [`JobRunner`] fires its [`Job`] on a fixed interval. Each tick runs on
//! its own task so a slow run never delays the timer, and a tick that finds
//! the previous run still in flight is dropped rather than queued.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SyncConfig;
use crate::sync::SyncService;

/// A unit of recurring work.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Run once. Errors are handled inside the job.
    async fn run(&self);
}

struct RunnerInner {
    job: Arc<dyn Job>,
    interval: Duration,
    running: AtomicBool,
}

/// Clears the in-flight flag when a run finishes, panics included.
struct RunningGuard(Arc<RunnerInner>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

impl RunnerInner {
    fn tick(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("⏭️  {} still running, skipping tick", self.job.name());
            return None;
        }

        let guard = RunningGuard(self.clone());
        Some(tokio::spawn(async move {
            let inner = guard.0.clone();
            inner.job.run().await;
            drop(guard);
        }))
    }
}

/// Drives one job on an interval with single-flight semantics.
pub struct JobRunner {
    inner: Arc<RunnerInner>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl JobRunner {
    pub fn new(job: Arc<dyn Job>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                job,
                interval,
                running: AtomicBool::new(false),
            }),
            timer: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.job.name()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Start the timer. The first tick fires immediately. Calling this on a
    /// started runner does nothing.
    pub fn start(&self) {
        let Ok(mut timer) = self.timer.lock() else {
            warn!("Timer lock poisoned for job {}", self.name());
            return;
        };
        if timer.is_some() {
            return;
        }

        let inner = self.inner.clone();
        *timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                inner.tick();
            }
        }));
        info!("⏱️  Started job {} (every {:?})", self.name(), self.inner.interval);
    }

    /// Stop the timer. A run already in flight is left to finish.
    pub fn stop(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
                info!("Stopped job {}", self.name());
            }
        }
    }

    /// Trigger one run now. Returns `None` when the previous run is still in flight.
    pub fn tick(&self) -> Option<JoinHandle<()>> {
        self.inner.tick()
    }

    pub fn is_started(&self) -> bool {
        self.timer.lock().map(|timer| timer.is_some()).unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Status and due-date reconciliation across all eligible accounts.
pub struct ReconcileJob {
    service: Arc<SyncService>,
}

impl ReconcileJob {
    pub fn new(service: Arc<SyncService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Job for ReconcileJob {
    fn name(&self) -> &str {
        "reconcile"
    }

    async fn run(&self) {
        let report = self.service.reconcile_all().await;
        if report.failed_tasks > 0 || report.auth_failures > 0 || report.failed_accounts > 0 {
            warn!("⚠️  Reconciliation finished with errors: {}", report.summary());
        } else {
            info!("✅ Reconciliation finished: {}", report.summary());
        }
    }
}

/// Import of externally changed tasks across all eligible accounts.
pub struct ImportJob {
    service: Arc<SyncService>,
}

impl ImportJob {
    pub fn new(service: Arc<SyncService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Job for ImportJob {
    fn name(&self) -> &str {
        "import"
    }

    async fn run(&self) {
        let report = self.service.import_all().await;
        if report.is_success() {
            info!("✅ Import finished: {}", report.summary());
        } else {
            warn!("⚠️  Import finished with errors: {}", report.summary());
        }
    }
}

/// The set of recurring jobs enabled by configuration.
pub struct Scheduler {
    runners: Vec<JobRunner>,
}

impl Scheduler {
    pub fn from_config(config: &SyncConfig, service: Arc<SyncService>) -> Self {
        let mut runners = Vec::new();
        if !config.enabled {
            info!("Sync disabled, no jobs scheduled");
            return Self { runners };
        }

        if config.status_sync_enabled {
            runners.push(JobRunner::new(
                Arc::new(ReconcileJob::new(service.clone())),
                config.status_sync_interval(),
            ));
        }
        if config.import_enabled {
            runners.push(JobRunner::new(Arc::new(ImportJob::new(service)), config.import_interval()));
        }

        Self { runners }
    }

    pub fn runners(&self) -> &[JobRunner] {
        &self.runners
    }

    pub fn runner(&self, name: &str) -> Option<&JobRunner> {
        self.runners.iter().find(|runner| runner.name() == name)
    }

    pub fn start(&self) {
        for runner in &self.runners {
            runner.start();
        }
    }

    pub fn stop(&self) {
        for runner in &self.runners {
            runner.stop();
        }
    }
}
