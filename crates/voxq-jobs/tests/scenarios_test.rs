//! End-to-end queue scenarios against the in-memory store.
//!
//! Each test wires a `MemoryJobStore` and a `MockSynthesisClient` into the
//! queue engine and walks a job through its lifecycle.

use std::sync::Arc;

use chrono::Utc;

use voxq_core::{
    BulkSelector, FieldRef, JobFilter, JobId, JobStatus, JobStore, PageRef, SynthesisRequest,
};
use voxq_db::MemoryJobStore;
use voxq_jobs::{
    FireOutcome, JobOutcome, QueueActions, QueueConfig, QueueRunner, RetentionSweeper, Trigger,
};
use voxq_synthesis::mock::MockSynthesisClient;

struct Harness {
    store: Arc<MemoryJobStore>,
    client: MockSynthesisClient,
    trigger: Trigger,
    actions: QueueActions,
}

fn harness(client: MockSynthesisClient, config: QueueConfig) -> Harness {
    let store = Arc::new(MemoryJobStore::new());
    let runner = QueueRunner::new(store.clone(), Arc::new(client.clone()));
    let sweeper = RetentionSweeper::new(store.clone(), config.retention_policy());
    let trigger = Trigger::new(runner, sweeper, &config);
    let actions = trigger.actions();
    Harness {
        store,
        client,
        trigger,
        actions,
    }
}

async fn enqueue_text(actions: &QueueActions, text: &str) -> JobId {
    actions
        .enqueue(
            SynthesisRequest::text(text),
            PageRef(7),
            FieldRef::new("field_speech"),
        )
        .await
        .expect("Failed to enqueue")
}

#[tokio::test]
async fn test_failed_synthesis_records_error() {
    let h = harness(
        MockSynthesisClient::failing("quota exceeded"),
        QueueConfig::default(),
    );

    let id = enqueue_text(&h.actions, "Hello").await;
    assert_eq!(id, JobId(1));
    let job = h.actions.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Waiting);
    assert!(job.error.is_none());
    assert!(job.completed_at.is_none());

    let report = h.trigger.runner().process_batch(3).await.unwrap();
    assert_eq!(report.selected, 1);
    assert_eq!(report.failed, 1);

    let job = h.actions.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("quota exceeded"));
    assert!(job.completed_at.is_none());
}

#[tokio::test]
async fn test_failed_job_not_reprocessed_until_run() {
    let h = harness(MockSynthesisClient::failing("quota exceeded"), QueueConfig::default());
    let id = enqueue_text(&h.actions, "Hello").await;

    h.trigger.runner().process_batch(3).await.unwrap();
    h.client.succeed();
    let report = h.trigger.runner().process_batch(3).await.unwrap();

    assert_eq!(report.selected, 0);
    assert_eq!(h.client.call_count(), 1);
    assert_eq!(h.actions.get(id).await.unwrap().status, JobStatus::Error);
}

#[tokio::test]
async fn test_manual_run_reprocesses_failed_job() {
    let h = harness(MockSynthesisClient::failing("quota exceeded"), QueueConfig::default());
    let id = enqueue_text(&h.actions, "Hello").await;
    h.trigger.runner().process_batch(3).await.unwrap();

    h.client.succeed();
    let before = Utc::now();
    let outcome = h.actions.run(id).await.unwrap();
    let after = Utc::now();

    assert_eq!(outcome, JobOutcome::Completed);
    let job = h.actions.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    let completed_at = job.completed_at.expect("completed_at must be set");
    assert!(completed_at >= before && completed_at <= after);
}

#[tokio::test]
async fn test_immediate_retention_deletes_on_next_sweep() {
    let config = QueueConfig::default()
        .with_delete_completed(true)
        .with_delete_completed_after(0);
    let h = harness(MockSynthesisClient::succeeding(), config.clone());
    let id = enqueue_text(&h.actions, "Hello").await;

    let outcome = h.actions.run(id).await.unwrap();
    assert_eq!(outcome, JobOutcome::Completed);

    let sweeper = RetentionSweeper::new(h.store.clone(), config.retention_policy());
    let report = sweeper.sweep().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert!(h.store.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delayed_retention_deletes_once_age_reached() {
    let config = QueueConfig::default()
        .with_delete_completed(true)
        .with_delete_completed_after(3600);
    let h = harness(MockSynthesisClient::succeeding(), config.clone());
    let id = enqueue_text(&h.actions, "Hello").await;
    assert_eq!(h.actions.run(id).await.unwrap(), JobOutcome::Completed);
    let completed_at = h.actions.get(id).await.unwrap().completed_at.unwrap();

    let sweeper = RetentionSweeper::new(h.store.clone(), config.retention_policy());
    let almost = completed_at + chrono::Duration::seconds(3599);
    assert_eq!(sweeper.sweep_at(almost).await.unwrap().deleted, 0);
    assert!(h.store.get(id).await.unwrap().is_some());

    let due = completed_at + chrono::Duration::seconds(3600);
    assert_eq!(sweeper.sweep_at(due).await.unwrap().deleted, 1);
    assert!(h.store.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_batch_takes_oldest_jobs_up_to_limit() {
    let h = harness(MockSynthesisClient::succeeding(), QueueConfig::default());
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(enqueue_text(&h.actions, &format!("text {i}")).await);
    }

    let report = h.trigger.runner().process_batch(3).await.unwrap();
    assert_eq!(report.selected, 3);
    assert_eq!(report.claimed, 3);

    for id in &ids[..3] {
        assert_eq!(h.actions.get(*id).await.unwrap().status, JobStatus::Completed);
    }
    for id in &ids[3..] {
        assert_eq!(h.actions.get(*id).await.unwrap().status, JobStatus::Waiting);
    }
}

#[tokio::test]
async fn test_delete_bulk_error_leaves_other_states() {
    let h = harness(
        MockSynthesisClient::succeeding().with_failure_for("bad", "voice not found"),
        QueueConfig::default(),
    );
    let good = enqueue_text(&h.actions, "good").await;
    let bad = enqueue_text(&h.actions, "bad").await;
    h.trigger.runner().process_batch(2).await.unwrap();
    let waiting = enqueue_text(&h.actions, "later").await;

    assert_eq!(h.actions.get(bad).await.unwrap().status, JobStatus::Error);

    let deleted = h.actions.delete_bulk(BulkSelector::Error).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(h.store.get(bad).await.unwrap().is_none());
    assert_eq!(h.actions.get(good).await.unwrap().status, JobStatus::Completed);
    assert_eq!(h.actions.get(waiting).await.unwrap().status, JobStatus::Waiting);
}

#[tokio::test]
async fn test_delete_bulk_pending_and_all() {
    let h = harness(MockSynthesisClient::succeeding(), QueueConfig::default());
    let done = enqueue_text(&h.actions, "done").await;
    h.actions.run(done).await.unwrap();
    enqueue_text(&h.actions, "a").await;
    enqueue_text(&h.actions, "b").await;

    assert_eq!(h.actions.delete_bulk(BulkSelector::Pending).await.unwrap(), 2);
    let remaining = h.actions.list(JobFilter::all()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, done);

    enqueue_text(&h.actions, "c").await;
    assert_eq!(h.actions.delete_bulk(BulkSelector::All).await.unwrap(), 2);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_delete_single_job() {
    let h = harness(MockSynthesisClient::succeeding(), QueueConfig::default());
    let id = enqueue_text(&h.actions, "Hello").await;

    assert!(h.actions.delete(id).await.unwrap());
    assert!(!h.actions.delete(id).await.unwrap());
    assert!(matches!(
        h.actions.get(id).await,
        Err(voxq_core::Error::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_run_unknown_job_is_not_found() {
    let h = harness(MockSynthesisClient::succeeding(), QueueConfig::default());
    let err = h.actions.run(JobId(404)).await.unwrap_err();
    assert!(matches!(err, voxq_core::Error::JobNotFound(JobId(404))));
}

#[tokio::test]
async fn test_run_processing_job_is_skipped() {
    let h = harness(MockSynthesisClient::succeeding(), QueueConfig::default());
    let id = enqueue_text(&h.actions, "Hello").await;
    assert!(h.store.claim(id).await.unwrap());

    assert_eq!(h.actions.run(id).await.unwrap(), JobOutcome::Skipped);
    assert_eq!(h.client.call_count(), 0);
    assert_eq!(h.actions.get(id).await.unwrap().status, JobStatus::Processing);
}

#[tokio::test]
async fn test_run_waiting_job_processes_it() {
    let h = harness(MockSynthesisClient::succeeding(), QueueConfig::default());
    let id = enqueue_text(&h.actions, "Hello").await;

    assert_eq!(h.actions.run(id).await.unwrap(), JobOutcome::Completed);
    assert_eq!(h.client.calls()[0], SynthesisRequest::text("Hello"));
}

#[tokio::test]
async fn test_fire_updates_last_run_and_status() {
    let config = QueueConfig::default().with_delete_completed_after(0);
    let h = harness(MockSynthesisClient::succeeding(), config);
    enqueue_text(&h.actions, "Hello").await;

    let status = h.actions.status().await.unwrap();
    assert!(status.last_run.is_none());
    assert_eq!(status.stats.waiting, 1);

    let outcome = h.trigger.fire().await.unwrap();
    let FireOutcome::Ran(report) = outcome else {
        panic!("expected the cycle to run");
    };
    assert_eq!(report.batch.completed, 1);
    assert_eq!(report.sweep.deleted, 1);

    let status = h.actions.status().await.unwrap();
    assert_eq!(
        status.last_run.map(|t| t.timestamp()),
        Some(report.finished_at.timestamp())
    );
    assert_eq!(status.stats.total, 0);
    assert_eq!(status.retention, "Completed jobs are deleted immediately");
}

#[tokio::test]
async fn test_configuration_error_fails_every_job_in_batch() {
    let client = MockSynthesisClient::succeeding();
    client.fail_with(voxq_synthesis::mock::config_error(
        "Synthesis API key is not configured",
    ));
    let h = harness(client, QueueConfig::default());
    for i in 0..3 {
        enqueue_text(&h.actions, &format!("text {i}")).await;
    }

    let report = h.trigger.runner().process_batch(0).await.unwrap();
    assert_eq!(report.failed, 3);

    let failed = h
        .actions
        .list(JobFilter::all().with_status(JobStatus::Error))
        .await
        .unwrap();
    assert_eq!(failed.len(), 3);
    assert!(failed
        .iter()
        .all(|job| job.error.as_deref() == Some("Synthesis API key is not configured")));
}
