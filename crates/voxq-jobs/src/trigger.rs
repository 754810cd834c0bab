//! Periodic and manual entry point for queue cycles.
//!
//! A cycle is one batch, one retention sweep and the `lastRun` update.
//! Cycles never overlap: a firing that finds a cycle in progress is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use voxq_core::defaults::EVENT_BUS_CAPACITY;
use voxq_core::{Error, Result};

use crate::actions::QueueActions;
use crate::config::QueueConfig;
use crate::events::TriggerEvent;
use crate::last_run::LastRun;
use crate::retention::{RetentionSweeper, SweepReport};
use crate::runner::{BatchReport, QueueRunner};

/// Summary of one finished cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub batch: BatchReport,
    pub sweep: SweepReport,
    pub finished_at: DateTime<Utc>,
}

/// What a firing did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Ran(CycleReport),
    /// Another cycle was still running.
    Skipped,
}

/// Fires queue cycles on a schedule or on demand.
///
/// Clones share the cycle lock, `lastRun` and the event channel.
#[derive(Clone)]
pub struct Trigger {
    runner: QueueRunner,
    sweeper: RetentionSweeper,
    interval_seconds: u64,
    parallel_calls: usize,
    stale_claim_after: Duration,
    last_run: LastRun,
    cycle_lock: Arc<Mutex<()>>,
    event_tx: broadcast::Sender<TriggerEvent>,
}

impl Trigger {
    /// Create a trigger; `runner` is wired to the trigger's event channel.
    pub fn new(runner: QueueRunner, sweeper: RetentionSweeper, config: &QueueConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            runner: runner.with_events(event_tx.clone()),
            sweeper,
            interval_seconds: config.interval_seconds,
            parallel_calls: config.parallel_calls,
            stale_claim_after: config.stale_claim_after(),
            last_run: LastRun::new(),
            cycle_lock: Arc::new(Mutex::new(())),
            event_tx,
        }
    }

    pub fn last_run(&self) -> &LastRun {
        &self.last_run
    }

    pub fn runner(&self) -> &QueueRunner {
        &self.runner
    }

    /// Manual actions sharing this trigger's store, runner and `lastRun`.
    pub fn actions(&self) -> QueueActions {
        QueueActions::new(
            self.runner.clone(),
            self.last_run.clone(),
            self.sweeper.policy(),
        )
    }

    /// Get a receiver for trigger events.
    pub fn events(&self) -> broadcast::Receiver<TriggerEvent> {
        self.event_tx.subscribe()
    }

    /// Run one cycle now unless one is already running.
    ///
    /// A store failure aborts the cycle, leaves `lastRun` untouched and is
    /// returned.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "trigger", op = "fire"))]
    pub async fn fire(&self) -> Result<FireOutcome> {
        let Ok(_cycle) = self.cycle_lock.try_lock() else {
            warn!("Previous cycle still running, skipping firing");
            self.emit(TriggerEvent::CycleSkipped);
            return Ok(FireOutcome::Skipped);
        };

        let batch = match self.runner.process_batch(self.parallel_calls).await {
            Ok(batch) => batch,
            Err(e) => return Err(self.cycle_failed(e)),
        };
        let sweep = match self.sweeper.sweep().await {
            Ok(sweep) => sweep,
            Err(e) => return Err(self.cycle_failed(e)),
        };

        let finished_at = Utc::now();
        self.last_run.record(finished_at);

        let report = CycleReport {
            batch,
            sweep,
            finished_at,
        };
        info!(
            batch_id = %report.batch.batch_id,
            completed = report.batch.completed,
            failed = report.batch.failed,
            deleted = report.sweep.deleted,
            "Cycle finished"
        );
        self.emit(TriggerEvent::CycleFinished {
            report: report.clone(),
        });
        Ok(FireOutcome::Ran(report))
    }

    /// Start the schedule and return a handle for control.
    pub fn start(self) -> TriggerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let trigger = self.clone();
        tokio::spawn(async move {
            trigger.run(&mut shutdown_rx).await;
        });

        TriggerHandle {
            shutdown_tx,
            event_rx,
            trigger: self,
        }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        self.requeue_orphans().await;

        info!(
            interval_secs = self.interval_seconds,
            parallel_calls = self.parallel_calls,
            "Queue trigger started"
        );
        self.emit(TriggerEvent::TriggerStarted);

        if self.interval_seconds == 0 {
            info!("Schedule disabled, only manual firings will run");
            let _ = shutdown_rx.recv().await;
        } else {
            self.tick_until_shutdown(shutdown_rx).await;
        }

        self.emit(TriggerEvent::TriggerStopped);
        info!("Queue trigger stopped");
    }

    async fn tick_until_shutdown(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        let period = Duration::from_secs(self.interval_seconds);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cycles = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Queue trigger received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("Scheduled firing");
                    let trigger = self.clone();
                    cycles.spawn(async move {
                        // Failures are logged and broadcast by fire itself.
                        let _ = trigger.fire().await;
                    });
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = ?e, "Cycle task panicked");
                    }
                }
            }
        }

        // Let a running cycle finish before reporting the trigger stopped.
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                error!(error = ?e, "Cycle task panicked");
            }
        }
    }

    /// Return processing jobs whose claim is older than `stale_claim_after`.
    ///
    /// Other instances sharing the store keep their in-flight claims.
    async fn requeue_orphans(&self) {
        let Some(cutoff) = chrono::Duration::from_std(self.stale_claim_after)
            .ok()
            .and_then(|lease| Utc::now().checked_sub_signed(lease))
        else {
            return;
        };
        match self.runner.store().requeue_stale_processing(cutoff).await {
            Ok(0) => {}
            Ok(requeued) => warn!(
                requeued,
                stale_after_secs = self.stale_claim_after.as_secs(),
                "Returned orphaned processing jobs to waiting"
            ),
            Err(e) => error!(error = %e, "Failed to requeue orphaned processing jobs"),
        }
    }

    fn cycle_failed(&self, e: Error) -> Error {
        error!(error = %e, "Cycle aborted by job store failure");
        self.emit(TriggerEvent::CycleFailed {
            error: e.to_string(),
        });
        e
    }

    fn emit(&self, event: TriggerEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Handle for controlling a running trigger.
pub struct TriggerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<TriggerEvent>,
    trigger: Trigger,
}

impl TriggerHandle {
    /// Signal the trigger to stop after any running cycle.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for trigger events.
    pub fn events(&self) -> broadcast::Receiver<TriggerEvent> {
        self.event_rx.resubscribe()
    }

    /// Fire a cycle immediately, outside the schedule.
    pub async fn fire_now(&self) -> Result<FireOutcome> {
        self.trigger.fire().await
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }
}
