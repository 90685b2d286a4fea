//! Deterministic artifact naming per size class.

use std::path::{Path, PathBuf};

use crate::sizes::SizeClass;

/// Maps each size class to its candidate and result files.
///
/// The candidate file is written by the generation job and read by the
/// validation job; the result file is written by validation and consumed by
/// the merge.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    work_dir: PathBuf,
    prefix: String,
}

impl ArtifactSet {
    pub fn new(work_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `<work_dir>/<prefix>-<bits>.candidates`
    pub fn candidates(&self, size: SizeClass) -> PathBuf {
        self.work_dir
            .join(format!("{}-{}.candidates", self.prefix, size))
    }

    /// `<work_dir>/<prefix>-<bits>`
    pub fn result(&self, size: SizeClass) -> PathBuf {
        self.work_dir.join(format!("{}-{}", self.prefix, size))
    }

    /// Every intermediate file a size class may leave behind.
    pub fn intermediates(&self, size: SizeClass) -> [PathBuf; 2] {
        [self.candidates(size), self.result(size)]
    }
}
