//! Error types for the launcher module.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Ways a single job can fail. Each is terminal for its size class only.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    /// The external process could not be started.
    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    /// The process ran and exited with a non-zero code.
    #[error("exited with code {code}")]
    NonZeroExit { code: i32 },

    /// The process was terminated by a signal.
    #[error("terminated by signal")]
    Signaled,

    /// The process exceeded the configured wall clock limit and was killed.
    #[error("timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },

    /// Waiting on the process failed.
    #[error("failed to wait for process: {0}")]
    Wait(String),

    /// The task supervising the process died.
    #[error("job supervisor aborted: {0}")]
    Aborted(String),
}

impl JobError {
    /// Creates a launch error from a spawn failure.
    pub fn launch(program: &Path, err: std::io::Error) -> Self {
        Self::Launch {
            program: program.display().to_string(),
            reason: err.to_string(),
        }
    }
}
