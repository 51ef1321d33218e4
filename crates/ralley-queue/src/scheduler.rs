//! Scheduler: picks due jobs, seeds recurrences, dispatches and retries.
//!
//! Each pass takes every due job out of the store's index, seeds the next
//! occurrence for recurrence triggers and hands the rest to the dispatcher on
//! their own tasks. Passes never wait for dispatches; outcomes are applied to the
//! store when each dispatch resolves.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::dispatcher::Dispatcher;
use crate::error::QueueError;
use crate::job::{Job, JobSource};
use crate::normalize::{normalize, RawRequest};
use crate::recurrence::plan_recurrence;
use crate::retry::plan_retry;
use crate::store::SharedJobStore;

/// Outcome of one scheduler pass.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Ids of recurrence children seeded in this pass.
    pub scheduled: Vec<String>,
    /// `REQUEST` triggers finished without a dispatch.
    pub triggers: Vec<String>,
    /// Ids handed to the dispatcher.
    pub dispatched: Vec<String>,
    /// Dispatch tasks spawned in this pass.
    pub handles: Vec<JoinHandle<()>>,
    /// A seeded occurrence was already due: missed occurrences are being replayed.
    pub catching_up: bool,
}

impl TickReport {
    /// Wait for every dispatch of this pass to resolve.
    pub async fn settle(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatch task failed");
            }
        }
    }
}

/// Job scheduler.
#[derive(Clone)]
pub struct Scheduler {
    config: QueueConfig,
    store: SharedJobStore,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    wakeup: Arc<Notify>,
}

impl Scheduler {
    pub fn new(
        config: QueueConfig,
        store: SharedJobStore,
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            dispatcher,
            clock,
            wakeup: Arc::new(Notify::new()),
        }
    }

    pub fn store(&self) -> &SharedJobStore {
        &self.store
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Register a job and wake the loop.
    pub fn submit(&self, job: Job) {
        self.store.lock().upsert(job);
        self.wakeup.notify_one();
    }

    /// Normalize an inbound request into a new `REQUEST` job and register it.
    pub fn enqueue_request(&self, raw: RawRequest) -> Result<Job, QueueError> {
        let job = normalize(
            Uuid::new_v4().to_string(),
            &self.config.workspace,
            raw,
            self.clock.now(),
        )?;

        info!(
            job_id = %job.id,
            url = %job.request.url,
            start = job.start,
            "Registered job"
        );
        self.submit(job.clone());
        Ok(job)
    }

    /// Run one pass over the due jobs.
    pub fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let due = self.store.lock().take_due(now);
        let mut report = TickReport::default();

        for job in due {
            if job.is_recurrence_trigger() {
                if let Some(child) = plan_recurrence(&job, now) {
                    info!(
                        job_id = %job.id,
                        next_id = %child.id,
                        start = child.start,
                        "Scheduled next occurrence"
                    );
                    report.catching_up |= child.start <= now;
                    report.scheduled.push(child.id.clone());
                    self.store.lock().upsert(child);
                }

                if job.source == JobSource::Request {
                    self.finish(&job.id);
                    report.triggers.push(job.id);
                    continue;
                }
            }

            report.dispatched.push(job.id.clone());
            let scheduler = self.clone();
            report
                .handles
                .push(tokio::spawn(async move { scheduler.process(job).await }));
        }

        report
    }

    async fn process(&self, job: Job) {
        info!(job_id = %job.id, trace = ?job.trace, "Processing job");

        match self.dispatcher.dispatch(&job).await {
            Ok(status) => info!(job_id = %job.id, status, "Job success"),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Job error");
                self.retry(&job);
            }
        }

        self.finish(&job.id);
    }

    fn retry(&self, job: &Job) {
        let now = self.clock.now();
        match plan_retry(job, now) {
            Some(child) => {
                info!(
                    job_id = %job.id,
                    next_id = %child.id,
                    delay = child.start - now,
                    attempts = child.attempts,
                    "Retrying failed job"
                );
                self.store.lock().upsert(child);
            }
            None if job.directives.retry.is_some() => {
                warn!(
                    job_id = %job.id,
                    trace = ?job.trace,
                    attempts = job.attempts,
                    "Retries exhausted"
                );
            }
            None => {}
        }
    }

    /// Apply the outcome of a finished job: delete it, or keep it in retain mode.
    fn finish(&self, id: &str) {
        {
            let mut store = self.store.lock();
            if self.config.retain {
                store.complete(id, self.clock.now());
            } else {
                store.delete(id);
            }
        }
        self.wakeup.notify_one();
    }

    /// Write the snapshot, if one is configured. Failures are logged only.
    pub async fn persist(&self) {
        let Some(path) = &self.config.snapshot_path else {
            return;
        };
        if let Err(e) = self.store.save(path).await {
            error!(path = %path.display(), error = %e, "Failed to persist jobs");
        }
    }

    /// How long to sleep before the next pass.
    fn sleep_duration(&self) -> Duration {
        let max = self.config.tick_interval();
        let Some(next) = self.store.lock().next_due() else {
            return max;
        };
        let wait = (next - self.clock.now()).max(0.0);
        Duration::try_from_secs_f64(wait).unwrap_or(max).min(max)
    }

    /// Pause before the pass after `report`.
    ///
    /// While missed occurrences are replayed the loop waits a full tick, so they are
    /// delivered one per `tick_interval` instead of back to back.
    fn next_pause(&self, report: &TickReport) -> Duration {
        if report.catching_up {
            self.config.tick_interval()
        } else {
            self.sleep_duration()
        }
    }

    /// Run passes until `shutdown` changes or its sender is dropped.
    ///
    /// In-flight dispatches are not awaited. The store is persisted once more on exit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            jobs = self.store.lock().len(),
            retain = self.config.retain,
            "Scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.tick();
            if !report.dispatched.is_empty() || !report.scheduled.is_empty() {
                debug!(
                    dispatched = report.dispatched.len(),
                    scheduled = report.scheduled.len(),
                    "Tick"
                );
            }
            self.persist().await;

            let pause = self.next_pause(&report);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.wakeup.notified(), if !report.catching_up => {}
                _ = shutdown.changed() => {
                    info!("Scheduler shutting down");
                    break;
                }
            }
        }

        info!("Closing queue and persisting jobs");
        self.persist().await;
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
