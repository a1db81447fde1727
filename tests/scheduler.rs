mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskmirror::config::SyncConfig;
use taskmirror::scheduler::{Job, JobRunner, Scheduler};

#[derive(Default)]
struct CountingJob {
    delay: Duration,
    runs: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl CountingJob {
    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Job for CountingJob {
    fn name(&self) -> &str {
        "counting"
    }

    async fn run(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_tick_is_single_flight() {
    let job = CountingJob::with_delay(Duration::from_millis(100));
    let runner = JobRunner::new(job.clone(), Duration::from_secs(60));

    let first = runner.tick().expect("first tick should run");
    assert!(runner.is_running());
    assert!(runner.tick().is_none());

    first.await.unwrap();
    assert!(!runner.is_running());
    assert_eq!(job.runs(), 1);

    runner.tick().expect("tick after completion should run").await.unwrap();
    assert_eq!(job.runs(), 2);
}

#[tokio::test]
async fn test_start_fires_immediately_and_stop_halts_timer() {
    let job = CountingJob::with_delay(Duration::ZERO);
    let runner = JobRunner::new(job.clone(), Duration::from_secs(3600));
    assert!(!runner.is_started());

    runner.start();
    runner.start();
    assert!(runner.is_started());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(job.runs(), 1);

    runner.stop();
    assert!(!runner.is_started());
}

#[tokio::test]
async fn test_slow_job_never_overlaps_itself() {
    let job = CountingJob::with_delay(Duration::from_millis(120));
    let runner = JobRunner::new(job.clone(), Duration::from_millis(20));

    runner.start();
    tokio::time::sleep(Duration::from_millis(400)).await;
    runner.stop();

    assert!(job.runs() >= 2);
    assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scheduler_builds_enabled_jobs() {
    let h = common::harness().await;

    let scheduler = Scheduler::from_config(&SyncConfig::default(), h.service.clone());
    assert_eq!(scheduler.runners().len(), 2);
    assert_eq!(
        scheduler.runner("reconcile").unwrap().interval(),
        Duration::from_secs(5 * 60)
    );
    assert_eq!(scheduler.runner("import").unwrap().interval(), Duration::from_secs(60));

    let config = SyncConfig {
        import_enabled: false,
        ..Default::default()
    };
    let scheduler = Scheduler::from_config(&config, h.service.clone());
    assert_eq!(scheduler.runners().len(), 1);
    assert!(scheduler.runner("import").is_none());

    let config = SyncConfig {
        enabled: false,
        ..Default::default()
    };
    assert!(Scheduler::from_config(&config, h.service.clone()).runners().is_empty());
}

#[tokio::test]
async fn test_import_job_runs_sync() {
    let h = common::harness().await;
    h.account("ann@example.com").await;
    h.provider.put(common::external(
        "ext-1",
        taskmirror::provider::ExternalStatus::NeedsAction,
        common::now(),
    ));

    let scheduler = Scheduler::from_config(&SyncConfig::default(), h.service.clone());
    scheduler
        .runner("import")
        .unwrap()
        .tick()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(h.task_count().await, 1);
}
