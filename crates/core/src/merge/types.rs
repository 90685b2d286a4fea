//! Types for the merge module.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::sizes::SizeClass;

/// Merge failures that leave no usable output.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot create merged output {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A failed append could not be cut back out of the output.
    #[error("cannot rewind merged output {path}: {source}")]
    Rewind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot finish writing merged output {path}: {source}")]
    Finish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A size class left out of the merged output, or an intermediate that
/// could not be cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    #[error("size class {size_class} skipped: validation did not succeed")]
    ValidationFailed { size_class: SizeClass },

    #[error("size class {size_class} skipped: result artifact {path} is missing")]
    ArtifactMissing { size_class: SizeClass, path: PathBuf },

    #[error("size class {size_class} skipped: cannot read {path}: {reason}")]
    ReadFailed {
        size_class: SizeClass,
        path: PathBuf,
        reason: String,
    },

    #[error("size class {size_class} skipped: cannot append to output: {reason}")]
    AppendFailed { size_class: SizeClass, reason: String },

    #[error("cannot remove intermediate {path}: {reason}")]
    CleanupFailed { path: PathBuf, reason: String },
}

impl MergeWarning {
    /// The size class this warning excludes from the output, if any.
    pub fn skipped_size(&self) -> Option<SizeClass> {
        match self {
            Self::ValidationFailed { size_class }
            | Self::ArtifactMissing { size_class, .. }
            | Self::ReadFailed { size_class, .. }
            | Self::AppendFailed { size_class, .. } => Some(*size_class),
            Self::CleanupFailed { .. } => None,
        }
    }
}

/// What went into the merged output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub output: PathBuf,
    /// Size classes appended, ascending.
    pub merged: Vec<SizeClass>,
    /// Size classes left out, ascending.
    pub skipped: Vec<SizeClass>,
    pub warnings: Vec<MergeWarning>,
    pub bytes_written: u64,
}
