//! Trait definitions for the launcher module.

use async_trait::async_trait;

use crate::job::Job;

use super::error::JobError;
use super::types::JobHandle;

/// Starts external jobs without waiting for them.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Returns the name of this launcher implementation.
    fn name(&self) -> &str;

    /// Starts `job` and returns a handle as soon as it is running.
    ///
    /// Only failure to start is reported here; the process outcome is
    /// observed through [`JobHandle::wait`].
    async fn launch(&self, job: &Job) -> Result<JobHandle, JobError>;
}
