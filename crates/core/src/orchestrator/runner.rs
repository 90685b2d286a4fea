//! Orchestrator implementation.

use chrono::Local;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{validate_config, Config};
use crate::host::{preflight, slot_capacity, Host};
use crate::job::{Job, JobTemplate, Stage};
use crate::launcher::Launcher;
use crate::merge::Merger;
use crate::metrics;
use crate::scheduler::{SlotPool, StageRunner};
use crate::sizes::SizeClass;

use super::types::{RunError, RunSummary};

/// Sequences preflight, both stages and the merge for one run.
pub struct Orchestrator {
    config: Config,
    host: Arc<dyn Host>,
    launcher: Arc<dyn Launcher>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config, host: Arc<dyn Host>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            config,
            host,
            launcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Once `cancel` fires no further jobs are dispatched; running jobs are
    /// waited for and the run ends with [`RunError::Cancelled`].
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Size classes of this run, ascending.
    pub fn size_classes(&self) -> Vec<SizeClass> {
        let schedule = &self.config.schedule;
        SizeClass::sequence(schedule.min_bits, schedule.max_bits, schedule.bit_delta)
    }

    /// Jobs a run would launch, in dispatch order, without launching them.
    pub fn plan(&self) -> Result<Vec<Job>, RunError> {
        validate_config(&self.config)?;
        let template = JobTemplate::from_config(&self.config);
        let sizes = self.size_classes();
        Ok([Stage::Generate, Stage::Validate]
            .into_iter()
            .flat_map(|stage| sizes.iter().map(move |&size| (stage, size)))
            .map(|(stage, size)| template.job(stage, size))
            .collect())
    }

    /// Executes the run.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let started_at = Local::now();
        validate_config(&self.config)?;

        let entropy_available = preflight(self.host.as_ref(), &self.config.preflight)?;
        let capacity = slot_capacity(self.host.as_ref(), self.config.schedule.max_slots);
        let sizes = self.size_classes();
        let template = JobTemplate::from_config(&self.config);

        let work_dir = template.artifacts().work_dir().to_path_buf();
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|source| RunError::WorkDir {
                path: work_dir.clone(),
                source,
            })?;

        info!(
            sizes = ?sizes.iter().map(|s| s.bits()).collect::<Vec<_>>(),
            slots = capacity,
            entropy = entropy_available,
            work_dir = %work_dir.display(),
            "Run started"
        );

        let runner = StageRunner::new(
            Arc::clone(&self.launcher),
            Arc::new(SlotPool::new(capacity)),
            template.clone(),
        )
        .with_poll_interval(self.config.schedule.poll_interval())
        .with_cancellation(self.cancel.clone());

        let generation = runner.run_stage(Stage::Generate, &sizes).await;
        self.check_cancelled(Stage::Generate)?;

        // Validation runs for every size class, including ones whose
        // generation failed; those fail on their own and are recorded.
        let validation = runner.run_stage(Stage::Validate, &sizes).await;
        self.check_cancelled(Stage::Validate)?;

        let completed_at = Local::now();
        let merge = Merger::from_config(&self.config, template.artifacts().clone())
            .merge(&sizes, &validation, completed_at)
            .await?;
        metrics::LAST_RUN_TIMESTAMP.set(completed_at.timestamp());

        let summary = RunSummary {
            started_at,
            completed_at,
            entropy_available,
            capacity,
            size_classes: sizes,
            generation,
            validation,
            merge,
        };

        if summary.is_clean() {
            info!(output = %summary.output_path().display(), "Run complete");
        } else {
            warn!(
                output = %summary.output_path().display(),
                merged = summary.merge.merged.len(),
                skipped = summary.merge.skipped.len(),
                "Run complete with failures"
            );
        }
        Ok(summary)
    }

    fn check_cancelled(&self, stage: Stage) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            warn!(stage = %stage, "Run cancelled");
            return Err(RunError::Cancelled { stage });
        }
        Ok(())
    }
}
