pub mod config;
pub mod host;
pub mod job;
pub mod launcher;
pub mod merge;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod sizes;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use host::{preflight, slot_capacity, Host, LocalHost, PreflightError};
pub use job::{ArtifactSet, Job, JobState, JobTemplate, Stage};
pub use launcher::{JobError, JobExit, JobHandle, Launcher, LauncherConfig, ProcessLauncher};
pub use merge::{MergeError, MergeReport, MergeWarning, Merger};
pub use orchestrator::{Orchestrator, RunError, RunSummary};
pub use scheduler::{JobResult, SlotPermit, SlotPool, StageReport, StageRunner};
pub use sizes::SizeClass;
