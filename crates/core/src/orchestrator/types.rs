//! Types for the orchestrator.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ConfigError;
use crate::host::PreflightError;
use crate::job::Stage;
use crate::merge::{MergeError, MergeReport};
use crate::scheduler::StageReport;
use crate::sizes::SizeClass;

/// Errors that end a run without output.
#[derive(Debug, Error)]
pub enum RunError {
    /// Host precondition not met. Nothing was launched.
    #[error("preflight failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Work directory for intermediate artifacts could not be created.
    #[error("cannot prepare work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// Cancelled during `stage`. Running jobs were allowed to finish; no
    /// output was produced.
    #[error("run cancelled during {stage} stage")]
    Cancelled { stage: Stage },
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub completed_at: DateTime<Local>,
    /// Entropy estimate seen by preflight (0 when the check is disabled).
    pub entropy_available: u32,
    /// Slot pool capacity.
    pub capacity: usize,
    pub size_classes: Vec<SizeClass>,
    pub generation: StageReport,
    pub validation: StageReport,
    pub merge: MergeReport,
}

impl RunSummary {
    pub fn output_path(&self) -> &Path {
        &self.merge.output
    }

    /// Human-readable per-size-class problems, generation first.
    pub fn warnings(&self) -> Vec<String> {
        let jobs = self
            .generation
            .failures()
            .chain(self.validation.failures())
            .map(|r| {
                let reason = r
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "failed".to_string());
                format!("{} {}: {}", r.stage, r.size_class, reason)
            });
        let merge = self.merge.warnings.iter().map(ToString::to_string);
        jobs.chain(merge).collect()
    }

    /// Every size class made it into the output.
    pub fn is_clean(&self) -> bool {
        self.merge.skipped.is_empty() && self.warnings().is_empty()
    }
}
