//! Drives one stage across all size classes under the slot limit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::{JobState, JobTemplate, Stage};
use crate::launcher::{JobError, Launcher};
use crate::metrics;
use crate::sizes::SizeClass;

use super::report::{JobResult, StageReport};
use super::slots::SlotPool;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs a stage's jobs with at most `slots.capacity()` in flight.
///
/// Size classes are dispatched strictly in the order given. A slot is taken
/// before launch and held until that job's process exits, so the pool count
/// always reflects running processes. [`run_stage`](Self::run_stage) returns
/// only after every dispatched job has finished.
pub struct StageRunner {
    launcher: Arc<dyn Launcher>,
    slots: Arc<SlotPool>,
    template: JobTemplate,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl StageRunner {
    pub fn new(launcher: Arc<dyn Launcher>, slots: Arc<SlotPool>, template: JobTemplate) -> Self {
        Self {
            launcher,
            slots,
            template,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// Upper bound on how long a blocked dispatcher sleeps between slot checks.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Stops dispatching new jobs once `cancel` fires. Jobs already running
    /// are still waited for.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn slots(&self) -> &Arc<SlotPool> {
        &self.slots
    }

    /// Dispatches `stage` for every size in `sizes` and waits for all of them.
    pub async fn run_stage(&self, stage: Stage, sizes: &[SizeClass]) -> StageReport {
        let started = Instant::now();
        info!(
            stage = %stage,
            jobs = sizes.len(),
            slots = self.slots.capacity(),
            launcher = self.launcher.name(),
            "Stage started"
        );

        let mut results = Vec::with_capacity(sizes.len());
        let mut dispatch_order = Vec::with_capacity(sizes.len());
        let mut peak_in_flight = 0;
        let mut in_flight: JoinSet<JobResult> = JoinSet::new();

        for (index, &size) in sizes.iter().enumerate() {
            let Some(permit) = self.slots.acquire(self.poll_interval, &self.cancel).await else {
                let remaining = &sizes[index..];
                warn!(
                    stage = %stage,
                    skipped = remaining.len(),
                    "Cancelled, not dispatching remaining jobs"
                );
                results.extend(remaining.iter().map(|&s| JobResult::pending(stage, s)));
                break;
            };

            let job = self.template.job(stage, size);
            dispatch_order.push(size);
            peak_in_flight = peak_in_flight.max(self.slots.occupied());

            match self.launcher.launch(&job).await {
                Ok(handle) => {
                    debug!(job = %job.id(), pid = ?handle.pid(), "Job dispatched");
                    in_flight.spawn(async move {
                        let outcome = handle.wait().await;
                        // The slot stays occupied until the process has exited.
                        drop(permit);
                        let result = JobResult::from_outcome(stage, size, outcome);
                        log_completion(&result);
                        result
                    });
                }
                Err(e) => {
                    drop(permit);
                    warn!(job = %job.id(), error = %e, "Job failed to launch");
                    let result = JobResult::failed(stage, size, e);
                    record(&result);
                    results.push(result);
                }
            }
        }

        // Barrier: nothing returns until every dispatched job is done.
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(result) => {
                    record(&result);
                    results.push(result);
                }
                Err(e) => warn!(stage = %stage, error = %e, "Job supervisor task lost"),
            }
        }

        for size in unfinished(&dispatch_order, &results) {
            let result = JobResult::failed(
                stage,
                size,
                JobError::Aborted("supervisor task lost".to_string()),
            );
            record(&result);
            results.push(result);
        }

        let report = StageReport::new(
            stage,
            results,
            dispatch_order,
            peak_in_flight,
            started.elapsed(),
        );
        info!(
            stage = %stage,
            succeeded = report.succeeded(),
            failed = report.failed(),
            pending = report.pending(),
            elapsed_ms = report.elapsed_ms,
            "Stage finished"
        );
        report
    }
}

/// Dispatched size classes that never reached a terminal state.
fn unfinished(dispatched: &[SizeClass], results: &[JobResult]) -> Vec<SizeClass> {
    let mut states: HashMap<SizeClass, JobState> = dispatched
        .iter()
        .map(|&size| (size, JobState::Running))
        .collect();
    for result in results {
        states.insert(result.size_class, result.state);
    }
    dispatched
        .iter()
        .copied()
        .filter(|size| !states.get(size).is_some_and(|state| state.is_terminal()))
        .collect()
}

fn log_completion(result: &JobResult) {
    match &result.error {
        None => info!(
            stage = %result.stage,
            size = %result.size_class,
            elapsed_ms = result.elapsed_ms,
            "Job succeeded"
        ),
        Some(e) => warn!(
            stage = %result.stage,
            size = %result.size_class,
            error = %e,
            stderr = result.stderr.as_deref().unwrap_or(""),
            "Job failed"
        ),
    }
}

fn record(result: &JobResult) {
    let outcome = if result.is_success() { "succeeded" } else { "failed" };
    metrics::JOBS_TOTAL
        .with_label_values(&[result.stage.as_str(), outcome])
        .inc();
    if result.elapsed_ms > 0 {
        metrics::JOB_DURATION
            .with_label_values(&[result.stage.as_str()])
            .observe(result.elapsed_ms as f64 / 1000.0);
    }
}
