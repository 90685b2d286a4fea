//! Mock launcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::job::{Job, Stage};
use crate::launcher::{JobError, JobExit, JobHandle, Launcher};
use crate::sizes::SizeClass;

/// What happened to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventKind {
    Launched,
    Completed { success: bool },
}

/// A launch or completion, stamped with a sequence number shared by every
/// event of one launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub seq: u64,
    pub kind: JobEventKind,
    pub stage: Stage,
    pub size_class: SizeClass,
}

type JobKey = (Stage, SizeClass);

/// Mock implementation of the Launcher trait.
///
/// Jobs run as tokio tasks that sleep for a configurable time and then
/// write the artifact a real tool would:
/// - generation writes `candidates <bits>` to the candidates file
/// - validation requires the candidates file and writes `moduli <bits>` to
///   the result file
///
/// Clones share state, so a test can keep one clone for assertions and hand
/// another to the code under test.
///
/// # Example
///
/// ```rust,ignore
/// use modforge_core::testing::MockLauncher;
///
/// let launcher = MockLauncher::new();
/// launcher.set_exit_code(Stage::Validate, SizeClass::new(4096), 1).await;
///
/// // Run the orchestrator with Arc::new(launcher.clone())...
///
/// assert!(launcher.max_in_flight() <= capacity);
/// ```
#[derive(Debug, Clone)]
pub struct MockLauncher {
    events: Arc<RwLock<Vec<JobEvent>>>,
    seq: Arc<AtomicU64>,
    invocations: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    default_duration: Arc<RwLock<Duration>>,
    durations: Arc<RwLock<HashMap<JobKey, Duration>>>,
    exit_codes: Arc<RwLock<HashMap<JobKey, i32>>>,
    launch_failures: Arc<RwLock<HashSet<JobKey>>>,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLauncher {
    /// Create a new mock launcher whose jobs finish immediately and succeed.
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            seq: Arc::new(AtomicU64::new(0)),
            invocations: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            default_duration: Arc::new(RwLock::new(Duration::ZERO)),
            durations: Arc::new(RwLock::new(HashMap::new())),
            exit_codes: Arc::new(RwLock::new(HashMap::new())),
            launch_failures: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Set how long every job runs unless overridden per job.
    pub async fn set_default_duration(&self, duration: Duration) {
        *self.default_duration.write().await = duration;
    }

    /// Set how long one job runs.
    pub async fn set_duration(&self, stage: Stage, size: SizeClass, duration: Duration) {
        self.durations.write().await.insert((stage, size), duration);
    }

    /// Make one job exit with `code` (0 restores success).
    pub async fn set_exit_code(&self, stage: Stage, size: SizeClass, code: i32) {
        self.exit_codes.write().await.insert((stage, size), code);
    }

    /// Make one job fail to start.
    pub async fn fail_launch(&self, stage: Stage, size: SizeClass) {
        self.launch_failures.write().await.insert((stage, size));
    }

    /// Every recorded event in sequence order.
    pub async fn events(&self) -> Vec<JobEvent> {
        self.events.read().await.clone()
    }

    /// Launch events of `stage`, in launch order.
    pub async fn launches(&self, stage: Stage) -> Vec<JobEvent> {
        self.filter(stage, |kind| kind == JobEventKind::Launched)
            .await
    }

    /// Completion events of `stage`, in completion order.
    pub async fn completions(&self, stage: Stage) -> Vec<JobEvent> {
        self.filter(stage, |kind| matches!(kind, JobEventKind::Completed { .. }))
            .await
    }

    /// Jobs that actually started.
    pub async fn launch_count(&self) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.kind == JobEventKind::Launched)
            .count()
    }

    /// Calls to `launch`, including ones configured to fail.
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Most jobs observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn filter(&self, stage: Stage, keep: impl Fn(JobEventKind) -> bool) -> Vec<JobEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.stage == stage && keep(e.kind))
            .cloned()
            .collect()
    }

    async fn record(&self, kind: JobEventKind, job: &Job) {
        let mut events = self.events.write().await;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        events.push(JobEvent {
            seq,
            kind,
            stage: job.stage,
            size_class: job.size_class,
        });
    }

    /// Simulates the tool's side effects and exit.
    async fn finish(job: &Job, code: i32) -> JobExit {
        if code != 0 {
            return JobExit {
                code: Some(code),
                stderr: format!("simulated failure of {}\n", job.id()),
                ..Default::default()
            };
        }

        let bits = job.size_class.bits();
        let content = match job.stage {
            Stage::Generate => format!("candidates {bits}\n"),
            Stage::Validate => {
                let input_present = match &job.input {
                    Some(input) => tokio::fs::try_exists(input).await.unwrap_or(false),
                    None => true,
                };
                if !input_present {
                    return JobExit {
                        code: Some(1),
                        stderr: "candidate file missing\n".to_string(),
                        ..Default::default()
                    };
                }
                format!("moduli {bits}\n")
            }
        };

        match tokio::fs::write(&job.output, content).await {
            Ok(()) => JobExit::success(Duration::ZERO),
            Err(e) => JobExit {
                code: Some(2),
                stderr: format!("cannot write {}: {}\n", job.output.display(), e),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn launch(&self, job: &Job) -> Result<JobHandle, JobError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let key = (job.stage, job.size_class);
        if self.launch_failures.read().await.contains(&key) {
            return Err(JobError::Launch {
                program: job.program.display().to_string(),
                reason: "simulated launch failure".to_string(),
            });
        }

        let duration = match self.durations.read().await.get(&key) {
            Some(d) => *d,
            None => *self.default_duration.read().await,
        };
        let code = self.exit_codes.read().await.get(&key).copied().unwrap_or(0);

        self.record(JobEventKind::Launched, job).await;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let this = self.clone();
        let job = job.clone();
        let id = job.id();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            let exit = Self::finish(&job, code).await;

            this.in_flight.fetch_sub(1, Ordering::SeqCst);
            this.record(
                JobEventKind::Completed {
                    success: exit.is_success(),
                },
                &job,
            )
            .await;

            Ok(JobExit {
                elapsed: started.elapsed(),
                ..exit
            })
        });

        Ok(JobHandle::new(id, None, task))
    }
}
