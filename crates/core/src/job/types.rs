//! Types for the job module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::sizes::SizeClass;

/// One of the two sequential phases applied across all size classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Produce a candidate set for a size class.
    Generate,
    /// Screen a candidate set, producing the final result artifact.
    Validate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single job: `Pending -> Running -> {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A fully rendered external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub stage: Stage,
    pub size_class: SizeClass,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Artifact the job reads, if any.
    pub input: Option<PathBuf>,
    /// Artifact the job is expected to write.
    pub output: PathBuf,
}

impl Job {
    /// Stable identifier, e.g. `generate-4096`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.stage, self.size_class)
    }
}
