//! Types for the launcher module.

use std::time::Duration;
use tokio::task::JoinHandle;

use super::error::JobError;

/// How a finished process exited, plus its retained output.
#[derive(Debug, Clone, Default)]
pub struct JobExit {
    /// Exit code, `None` if terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl JobExit {
    /// A clean exit with no output.
    pub fn success(elapsed: Duration) -> Self {
        Self {
            code: Some(0),
            elapsed,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Converts a non-zero or signalled exit into the matching [`JobError`].
    pub fn check(&self) -> Result<(), JobError> {
        match self.code {
            Some(0) => Ok(()),
            Some(code) => Err(JobError::NonZeroExit { code }),
            None => Err(JobError::Signaled),
        }
    }
}

/// Handle to a running job.
///
/// Dropping the handle does not stop the process.
#[derive(Debug)]
pub struct JobHandle {
    job_id: String,
    pid: Option<u32>,
    task: JoinHandle<Result<JobExit, JobError>>,
}

impl JobHandle {
    pub fn new(
        job_id: impl Into<String>,
        pid: Option<u32>,
        task: JoinHandle<Result<JobExit, JobError>>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            pid,
            task,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// OS process id, when the job is backed by a real process.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Suspends the caller until the job exits.
    pub async fn wait(self) -> Result<JobExit, JobError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(JobError::Aborted(e.to_string())),
        }
    }
}
