//! Scheduling, non-overlap and failure reporting of `Trigger`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use voxq_core::{
    Error, FieldRef, Job, JobFilter, JobId, JobStatus, JobStore, PageRef, QueueStats, Result,
    SynthesisRequest,
};
use voxq_db::MemoryJobStore;
use voxq_jobs::{
    FireOutcome, QueueConfig, QueueRunner, RetentionPolicy, RetentionSweeper, Trigger,
    TriggerEvent,
};
use voxq_synthesis::mock::MockSynthesisClient;

fn trigger_for(
    store: Arc<dyn JobStore>,
    client: &MockSynthesisClient,
    config: &QueueConfig,
) -> Trigger {
    let runner = QueueRunner::new(store.clone(), Arc::new(client.clone()))
        .with_synthesis_timeout(config.synthesis_timeout());
    let sweeper = RetentionSweeper::new(store, config.retention_policy());
    Trigger::new(runner, sweeper, config)
}

async fn enqueue(store: &dyn JobStore, text: &str) -> JobId {
    store
        .enqueue(SynthesisRequest::text(text), PageRef(1), FieldRef::new("speech"))
        .await
        .expect("Failed to enqueue")
}

/// Wait for the first event matching `pred`, skipping others.
async fn wait_for(
    rx: &mut broadcast::Receiver<TriggerEvent>,
    pred: impl Fn(&TriggerEvent) -> bool,
) -> TriggerEvent {
    loop {
        let event = rx.recv().await.expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

/// Store whose retention deletes fail.
struct BrokenSweepStore {
    inner: MemoryJobStore,
    broken: AtomicBool,
}

#[async_trait]
impl JobStore for BrokenSweepStore {
    async fn enqueue(&self, r: SynthesisRequest, p: PageRef, f: FieldRef) -> Result<JobId> {
        self.inner.enqueue(r, p, f).await
    }
    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        self.inner.list(filter).await
    }
    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        self.inner.get(id).await
    }
    async fn claim(&self, id: JobId) -> Result<bool> {
        self.inner.claim(id).await
    }
    async fn mark_completed(&self, id: JobId, at: DateTime<Utc>) -> Result<bool> {
        self.inner.mark_completed(id, at).await
    }
    async fn mark_error(&self, id: JobId, message: &str) -> Result<bool> {
        self.inner.mark_error(id, message).await
    }
    async fn reset_to_waiting(&self, id: JobId) -> Result<bool> {
        self.inner.reset_to_waiting(id).await
    }
    async fn delete(&self, id: JobId) -> Result<bool> {
        self.inner.delete(id).await
    }
    async fn delete_by_status(&self, status: JobStatus) -> Result<u64> {
        self.inner.delete_by_status(status).await
    }
    async fn delete_all(&self) -> Result<u64> {
        self.inner.delete_all().await
    }
    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::Store("relation \"synthesis_jobs\" is locked".into()));
        }
        self.inner.delete_completed_before(cutoff).await
    }
    async fn stats(&self) -> Result<QueueStats> {
        self.inner.stats().await
    }
    async fn requeue_stale_processing(&self, claimed_before: DateTime<Utc>) -> Result<u64> {
        self.inner.requeue_stale_processing(claimed_before).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_fire_is_skipped() {
    let store = Arc::new(MemoryJobStore::new());
    enqueue(store.as_ref(), "slow").await;
    let client = MockSynthesisClient::succeeding().with_latency(Duration::from_secs(10));
    let trigger = trigger_for(store.clone(), &client, &QueueConfig::default());
    let mut events = trigger.events();

    let running = tokio::spawn({
        let trigger = trigger.clone();
        async move { trigger.fire().await }
    });
    wait_for(&mut events, |e| matches!(e, TriggerEvent::JobStarted { .. })).await;

    let second = trigger.fire().await.unwrap();
    assert_eq!(second, FireOutcome::Skipped);
    wait_for(&mut events, |e| matches!(e, TriggerEvent::CycleSkipped)).await;

    let first = running.await.unwrap().unwrap();
    assert!(matches!(first, FireOutcome::Ran(ref r) if r.batch.completed == 1));
    assert_eq!(client.call_count(), 1);

    // The lock is released once the cycle is over.
    assert!(matches!(trigger.fire().await.unwrap(), FireOutcome::Ran(_)));
}

#[tokio::test]
async fn test_fire_records_last_run() {
    let store = Arc::new(MemoryJobStore::new());
    let client = MockSynthesisClient::succeeding();
    let trigger = trigger_for(store, &client, &QueueConfig::default());
    assert!(trigger.last_run().get().is_none());

    let outcome = trigger.fire().await.unwrap();

    let FireOutcome::Ran(report) = outcome else {
        panic!("expected the cycle to run");
    };
    assert_eq!(report.batch.selected, 0);
    assert_eq!(trigger.last_run().unix_seconds(), report.finished_at.timestamp());
}

#[tokio::test]
async fn test_fire_uses_parallel_calls_as_limit() {
    let store = Arc::new(MemoryJobStore::new());
    for i in 0..5 {
        enqueue(store.as_ref(), &format!("t{i}")).await;
    }
    let client = MockSynthesisClient::succeeding();
    let config = QueueConfig::default().with_parallel_calls(2);
    let trigger = trigger_for(store.clone(), &client, &config);

    trigger.fire().await.unwrap();

    assert_eq!(store.stats().await.unwrap().waiting, 3);
}

#[tokio::test]
async fn test_sweep_failure_aborts_cycle() {
    let store = Arc::new(BrokenSweepStore {
        inner: MemoryJobStore::new(),
        broken: AtomicBool::new(true),
    });
    let client = MockSynthesisClient::succeeding();
    let trigger = trigger_for(store.clone(), &client, &QueueConfig::default());
    let mut events = trigger.events();

    let err = trigger.fire().await.unwrap_err();

    assert!(err.is_persistence());
    assert_eq!(trigger.last_run().unix_seconds(), 0);
    let event = wait_for(&mut events, |e| matches!(e, TriggerEvent::CycleFailed { .. })).await;
    let TriggerEvent::CycleFailed { error } = event else {
        unreachable!();
    };
    assert!(error.contains("is locked"));

    store.broken.store(false, Ordering::SeqCst);
    assert!(matches!(trigger.fire().await.unwrap(), FireOutcome::Ran(_)));
}

#[tokio::test]
async fn test_disabled_retention_keeps_completed_jobs() {
    let store = Arc::new(MemoryJobStore::new());
    enqueue(store.as_ref(), "keep me").await;
    let client = MockSynthesisClient::succeeding();
    let runner = QueueRunner::new(store.clone(), Arc::new(client));
    let sweeper = RetentionSweeper::new(store.clone(), RetentionPolicy::keep_all());
    let trigger = Trigger::new(runner, sweeper, &QueueConfig::default());

    let FireOutcome::Ran(report) = trigger.fire().await.unwrap() else {
        panic!("expected the cycle to run");
    };

    assert_eq!(report.sweep.deleted, 0);
    assert_eq!(store.stats().await.unwrap().completed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_cycles_run_every_interval() {
    let store = Arc::new(MemoryJobStore::new());
    enqueue(store.as_ref(), "first").await;
    let client = MockSynthesisClient::succeeding();
    let config = QueueConfig::default().with_interval(60);
    let handle = trigger_for(store.clone(), &client, &config).start();
    let mut events = handle.events();

    wait_for(&mut events, |e| matches!(e, TriggerEvent::TriggerStarted)).await;
    let started = tokio::time::Instant::now();

    wait_for(&mut events, |e| matches!(e, TriggerEvent::CycleFinished { .. })).await;
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(store.stats().await.unwrap().completed, 1);

    enqueue(store.as_ref(), "second").await;
    wait_for(&mut events, |e| matches!(e, TriggerEvent::CycleFinished { .. })).await;
    assert_eq!(store.stats().await.unwrap().completed, 2);

    handle.shutdown().await.unwrap();
    wait_for(&mut events, |e| matches!(e, TriggerEvent::TriggerStopped)).await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_only_fires_manually() {
    let store = Arc::new(MemoryJobStore::new());
    enqueue(store.as_ref(), "manual").await;
    let client = MockSynthesisClient::succeeding();
    let config = QueueConfig::default().with_interval(0);
    let handle = trigger_for(store.clone(), &client, &config).start();
    let mut events = handle.events();
    wait_for(&mut events, |e| matches!(e, TriggerEvent::TriggerStarted)).await;

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(client.call_count(), 0);

    let outcome = handle.fire_now().await.unwrap();
    assert!(matches!(outcome, FireOutcome::Ran(ref r) if r.batch.completed == 1));
    assert!(handle.trigger().last_run().get().is_some());

    handle.shutdown().await.unwrap();
    wait_for(&mut events, |e| matches!(e, TriggerEvent::TriggerStopped)).await;
}

#[tokio::test]
async fn test_start_requeues_orphaned_processing_jobs() {
    let store = Arc::new(MemoryJobStore::new());
    let id = enqueue(store.as_ref(), "orphan").await;
    store.claim(id).await.unwrap();
    // Let the claim age past the one-second lease.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let client = MockSynthesisClient::succeeding();
    let config = QueueConfig::default()
        .with_interval(0)
        .with_synthesis_timeout(1)
        .with_stale_claim_after(1);
    let handle = trigger_for(store.clone(), &client, &config).start();
    let mut events = handle.events();
    wait_for(&mut events, |e| matches!(e, TriggerEvent::TriggerStarted)).await;

    let job = store.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Waiting);
    assert!(job.claimed_at.is_none());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_keeps_fresh_processing_claims() {
    let store = Arc::new(MemoryJobStore::new());
    let id = enqueue(store.as_ref(), "in flight elsewhere").await;
    store.claim(id).await.unwrap();

    let client = MockSynthesisClient::succeeding();
    let config = QueueConfig::default().with_interval(0);
    let handle = trigger_for(store.clone(), &client, &config).start();
    let mut events = handle.events();
    wait_for(&mut events, |e| matches!(e, TriggerEvent::TriggerStarted)).await;

    assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Processing);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_second_instance_does_not_take_over_running_job() {
    let store = Arc::new(MemoryJobStore::new());
    let id = enqueue(store.as_ref(), "shared").await;
    let client = MockSynthesisClient::succeeding().with_latency(Duration::from_secs(30));
    let config = QueueConfig::default().with_interval(0);

    let first = trigger_for(store.clone(), &client, &config);
    let mut first_events = first.events();
    let running = tokio::spawn({
        let first = first.clone();
        async move { first.fire().await }
    });
    wait_for(&mut first_events, |e| matches!(e, TriggerEvent::JobStarted { .. })).await;

    let second = trigger_for(store.clone(), &client, &config).start();
    let mut second_events = second.events();
    wait_for(&mut second_events, |e| matches!(e, TriggerEvent::TriggerStarted)).await;
    assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Processing);

    let outcome = second.fire_now().await.unwrap();
    assert!(matches!(outcome, FireOutcome::Ran(ref r) if r.batch.selected == 0));

    let outcome = running.await.unwrap().unwrap();
    assert!(matches!(outcome, FireOutcome::Ran(ref r) if r.batch.completed == 1));
    assert_eq!(client.call_count(), 1);
    assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Completed);

    second.shutdown().await.unwrap();
}
