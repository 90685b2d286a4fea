//! Jobs: one external invocation per (stage, size class) pair.

mod artifacts;
mod template;
mod types;

pub use artifacts::ArtifactSet;
pub use template::JobTemplate;
pub use types::{Job, JobState, Stage};
