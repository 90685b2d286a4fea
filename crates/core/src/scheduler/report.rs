//! Per-job and per-stage outcomes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::job::{JobState, Stage};
use crate::launcher::{JobError, JobExit};
use crate::sizes::SizeClass;

/// Outcome of one (stage, size class) job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub stage: Stage,
    pub size_class: SizeClass,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Retained stderr of a failed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    pub elapsed_ms: u64,
}

impl JobResult {
    /// A job that was never dispatched.
    pub fn pending(stage: Stage, size_class: SizeClass) -> Self {
        Self {
            stage,
            size_class,
            state: JobState::Pending,
            error: None,
            exit_code: None,
            stderr: None,
            elapsed_ms: 0,
        }
    }

    pub fn failed(stage: Stage, size_class: SizeClass, error: JobError) -> Self {
        Self {
            state: JobState::Failed,
            error: Some(error),
            ..Self::pending(stage, size_class)
        }
    }

    /// Classifies what a job handle reported once its process finished.
    pub fn from_outcome(
        stage: Stage,
        size_class: SizeClass,
        outcome: Result<JobExit, JobError>,
    ) -> Self {
        match outcome {
            Ok(exit) => {
                let elapsed_ms = duration_ms(exit.elapsed);
                match exit.check() {
                    Ok(()) => Self {
                        state: JobState::Succeeded,
                        exit_code: exit.code,
                        elapsed_ms,
                        ..Self::pending(stage, size_class)
                    },
                    Err(error) => Self {
                        exit_code: exit.code,
                        stderr: (!exit.stderr.trim().is_empty()).then_some(exit.stderr),
                        elapsed_ms,
                        ..Self::failed(stage, size_class, error)
                    },
                }
            }
            Err(error) => Self::failed(stage, size_class, error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

/// Every per-size-class outcome of one stage, sorted by ascending size class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub results: Vec<JobResult>,
    /// Size classes in the order they were handed to the launcher.
    pub dispatch_order: Vec<SizeClass>,
    /// Most jobs observed in flight at once.
    pub peak_in_flight: usize,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub(crate) fn new(
        stage: Stage,
        mut results: Vec<JobResult>,
        dispatch_order: Vec<SizeClass>,
        peak_in_flight: usize,
        elapsed: Duration,
    ) -> Self {
        results.sort_by_key(|r| r.size_class);
        Self {
            stage,
            results,
            dispatch_order,
            peak_in_flight,
            elapsed_ms: duration_ms(elapsed),
        }
    }

    pub fn result(&self, size: SizeClass) -> Option<&JobResult> {
        self.results.iter().find(|r| r.size_class == size)
    }

    pub fn is_success(&self, size: SizeClass) -> bool {
        self.result(size).is_some_and(JobResult::is_success)
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobState::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(JobState::Failed)
    }

    /// Jobs never dispatched because the run was cancelled.
    pub fn pending(&self) -> usize {
        self.count(JobState::Pending)
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.results
            .iter()
            .filter(|r| r.state == JobState::Failed)
    }

    fn count(&self, state: JobState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }
}
