//! Concatenates per-size-class result artifacts.

use chrono::{DateTime, Local};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::job::ArtifactSet;
use crate::metrics;
use crate::scheduler::StageReport;
use crate::sizes::SizeClass;

use super::types::{MergeError, MergeReport, MergeWarning};

/// Timestamp format of the merged output file name.
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Builds the run's single output file from validated results.
#[derive(Debug, Clone)]
pub struct Merger {
    artifacts: ArtifactSet,
    output_dir: PathBuf,
    prefix: String,
    keep_failed_artifacts: bool,
}

impl Merger {
    pub fn new(
        artifacts: ArtifactSet,
        output_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            artifacts,
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            keep_failed_artifacts: true,
        }
    }

    pub fn from_config(config: &Config, artifacts: ArtifactSet) -> Self {
        Self::new(
            artifacts,
            config.output.output_dir.clone(),
            config.output.prefix.clone(),
        )
        .keep_failed_artifacts(config.output.keep_failed_artifacts)
    }

    /// Whether intermediates of size classes that were not merged stay on disk.
    pub fn keep_failed_artifacts(mut self, keep: bool) -> Self {
        self.keep_failed_artifacts = keep;
        self
    }

    /// `<output_dir>/<prefix>-<YYYYMMDD-HHMMSS>`
    pub fn output_path(&self, completed_at: DateTime<Local>) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}",
            self.prefix,
            completed_at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Appends the result of every size class that passed validation, in
    /// ascending order, then removes the merged intermediates.
    pub async fn merge(
        &self,
        sizes: &[SizeClass],
        validation: &StageReport,
        completed_at: DateTime<Local>,
    ) -> Result<MergeReport, MergeError> {
        let output = self.output_path(completed_at);
        let mut file = self.create_output(&output).await?;

        let mut ordered = sizes.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut report = MergeReport {
            output: output.clone(),
            merged: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            bytes_written: 0,
        };

        for size in ordered {
            match self.append(&mut file, size, validation).await {
                Ok(bytes) => {
                    debug!(size = %size, bytes, "Merged result");
                    report.merged.push(size);
                    report.bytes_written += bytes;
                    metrics::MERGED_SIZE_CLASSES.inc();
                    self.remove_intermediates(size, &mut report.warnings).await;
                }
                Err(warning) => {
                    if matches!(warning, MergeWarning::AppendFailed { .. }) {
                        rewind(&mut file, report.bytes_written, &output).await?;
                    }
                    warn!(size = %size, "{}", warning);
                    report.skipped.push(size);
                    report.warnings.push(warning);
                    metrics::SKIPPED_SIZE_CLASSES.inc();
                    if !self.keep_failed_artifacts {
                        self.remove_intermediates(size, &mut report.warnings).await;
                    }
                }
            }
        }

        let finished = match file.flush().await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };
        finished.map_err(|source| MergeError::Finish {
            path: output.clone(),
            source,
        })?;

        info!(
            output = %output.display(),
            merged = report.merged.len(),
            skipped = report.skipped.len(),
            bytes = report.bytes_written,
            "Merge complete"
        );
        Ok(report)
    }

    async fn create_output(&self, output: &Path) -> Result<File, MergeError> {
        let created = match fs::create_dir_all(&self.output_dir).await {
            // Never overwrite the output of an earlier run.
            Ok(()) => {
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(output)
                    .await
            }
            Err(e) => Err(e),
        };
        created.map_err(|source| MergeError::Create {
            path: output.to_path_buf(),
            source,
        })
    }

    /// Appends one size class, returning bytes written.
    async fn append(
        &self,
        file: &mut File,
        size: SizeClass,
        validation: &StageReport,
    ) -> Result<u64, MergeWarning> {
        if !validation.is_success(size) {
            return Err(MergeWarning::ValidationFailed { size_class: size });
        }

        let path = self.artifacts.result(size);
        // Read fully before writing so an unreadable artifact leaves no
        // partial bytes in the output.
        let bytes = fs::read(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                MergeWarning::ArtifactMissing {
                    size_class: size,
                    path: path.clone(),
                }
            } else {
                MergeWarning::ReadFailed {
                    size_class: size,
                    path: path.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        // Flush per size class so a failed write is charged to the size
        // class that caused it.
        let written = match file.write_all(&bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| MergeWarning::AppendFailed {
            size_class: size,
            reason: e.to_string(),
        })?;

        Ok(bytes.len() as u64)
    }

    async fn remove_intermediates(&self, size: SizeClass, warnings: &mut Vec<MergeWarning>) {
        for path in self.artifacts.intermediates(size) {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed intermediate"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    let warning = MergeWarning::CleanupFailed {
                        path,
                        reason: e.to_string(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }
    }
}

/// Cuts the output back to the last completely appended size class.
async fn rewind(file: &mut File, len: u64, output: &Path) -> Result<(), MergeError> {
    let rewound = match file.set_len(len).await {
        Ok(()) => file.seek(SeekFrom::Start(len)).await.map(|_| ()),
        Err(e) => Err(e),
    };
    rewound.map_err(|source| MergeError::Rewind {
        path: output.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Stage;
    use crate::launcher::{JobError, JobExit};
    use crate::scheduler::JobResult;
    use chrono::TimeZone;
    use std::time::Duration;

    fn completed_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn validation(passed: &[u32], failed: &[u32]) -> StageReport {
        let mut results: Vec<JobResult> = passed
            .iter()
            .map(|&b| {
                JobResult::from_outcome(
                    Stage::Validate,
                    SizeClass::new(b),
                    Ok(JobExit::success(Duration::ZERO)),
                )
            })
            .collect();
        results.extend(failed.iter().map(|&b| {
            JobResult::failed(
                Stage::Validate,
                SizeClass::new(b),
                JobError::NonZeroExit { code: 1 },
            )
        }));
        let order = results.iter().map(|r| r.size_class).collect();
        StageReport::new(Stage::Validate, results, order, 1, Duration::ZERO)
    }

    fn write_results(artifacts: &ArtifactSet, bits: &[u32]) {
        for &b in bits {
            let size = SizeClass::new(b);
            std::fs::write(artifacts.candidates(size), format!("candidates {b}\n")).unwrap();
            std::fs::write(artifacts.result(size), format!("result {b}\n")).unwrap();
        }
    }

    fn sizes(bits: &[u32]) -> Vec<SizeClass> {
        bits.iter().copied().map(SizeClass::new).collect()
    }

    #[test]
    fn test_output_path() {
        let merger = Merger::new(ArtifactSet::new("/work", "moduli"), "/out", "moduli");
        assert_eq!(
            merger.output_path(completed_at()),
            PathBuf::from("/out/moduli-20260314-092653")
        );
    }

    #[tokio::test]
    async fn test_merge_in_ascending_order() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(work.path(), "moduli");
        write_results(&artifacts, &[3072, 4096, 5120]);
        let merger = Merger::new(artifacts.clone(), out.path(), "moduli");

        // Deliberately unsorted input.
        let report = merger
            .merge(
                &sizes(&[5120, 3072, 4096]),
                &validation(&[3072, 4096, 5120], &[]),
                completed_at(),
            )
            .await
            .unwrap();

        let merged = std::fs::read_to_string(&report.output).unwrap();
        assert_eq!(merged, "result 3072\nresult 4096\nresult 5120\n");
        assert_eq!(report.merged, sizes(&[3072, 4096, 5120]));
        assert_eq!(report.bytes_written, merged.len() as u64);
        assert!(report.warnings.is_empty());

        for size in sizes(&[3072, 4096, 5120]) {
            for path in artifacts.intermediates(size) {
                assert!(!path.exists(), "{} not removed", path.display());
            }
        }
    }

    #[tokio::test]
    async fn test_failed_validation_is_skipped_and_kept() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(work.path(), "moduli");
        write_results(&artifacts, &[3072, 4096, 5120]);
        let merger = Merger::new(artifacts.clone(), out.path(), "moduli");

        let report = merger
            .merge(
                &sizes(&[3072, 4096, 5120]),
                &validation(&[3072, 5120], &[4096]),
                completed_at(),
            )
            .await
            .unwrap();

        let merged = std::fs::read_to_string(&report.output).unwrap();
        assert_eq!(merged, "result 3072\nresult 5120\n");
        assert_eq!(report.skipped, sizes(&[4096]));
        assert_eq!(
            report.warnings,
            vec![MergeWarning::ValidationFailed {
                size_class: SizeClass::new(4096)
            }]
        );
        assert!(artifacts.result(SizeClass::new(4096)).exists());
    }

    #[tokio::test]
    async fn test_failed_artifacts_removed_when_not_kept() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(work.path(), "moduli");
        write_results(&artifacts, &[3072, 4096]);
        let merger =
            Merger::new(artifacts.clone(), out.path(), "moduli").keep_failed_artifacts(false);

        merger
            .merge(
                &sizes(&[3072, 4096]),
                &validation(&[3072], &[4096]),
                completed_at(),
            )
            .await
            .unwrap();

        for path in artifacts.intermediates(SizeClass::new(4096)) {
            assert!(!path.exists());
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_is_skipped() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(work.path(), "moduli");
        write_results(&artifacts, &[3072]);
        let merger = Merger::new(artifacts.clone(), out.path(), "moduli");

        let report = merger
            .merge(
                &sizes(&[3072, 4096]),
                &validation(&[3072, 4096], &[]),
                completed_at(),
            )
            .await
            .unwrap();

        assert_eq!(report.merged, sizes(&[3072]));
        assert!(matches!(
            report.warnings.as_slice(),
            [MergeWarning::ArtifactMissing { size_class, .. }] if size_class.bits() == 4096
        ));
    }

    #[tokio::test]
    async fn test_nothing_to_merge_still_creates_output() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let merger = Merger::new(ArtifactSet::new(work.path(), "moduli"), out.path(), "moduli");

        let report = merger
            .merge(&sizes(&[3072]), &validation(&[], &[3072]), completed_at())
            .await
            .unwrap();

        assert!(report.output.exists());
        assert_eq!(report.bytes_written, 0);
        assert_eq!(report.skipped, sizes(&[3072]));
    }

    #[tokio::test]
    async fn test_unreadable_result_is_skipped() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(work.path(), "moduli");
        write_results(&artifacts, &[3072, 5120]);
        // A directory where the result file should be cannot be read.
        std::fs::create_dir(artifacts.result(SizeClass::new(4096))).unwrap();
        let merger = Merger::new(artifacts.clone(), out.path(), "moduli");

        let report = merger
            .merge(
                &sizes(&[3072, 4096, 5120]),
                &validation(&[3072, 4096, 5120], &[]),
                completed_at(),
            )
            .await
            .unwrap();

        let merged = std::fs::read_to_string(&report.output).unwrap();
        assert_eq!(merged, "result 3072\nresult 5120\n");
        assert_eq!(report.merged, sizes(&[3072, 5120]));
        assert_eq!(report.skipped, sizes(&[4096]));
        assert!(matches!(
            report.warnings.as_slice(),
            [MergeWarning::ReadFailed { size_class, .. }] if size_class.bits() == 4096
        ));
        assert!(artifacts.result(SizeClass::new(4096)).is_dir());
    }

    #[tokio::test]
    async fn test_existing_output_is_not_overwritten() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(work.path(), "moduli");
        write_results(&artifacts, &[3072]);
        let merger = Merger::new(artifacts.clone(), out.path(), "moduli");
        let existing = merger.output_path(completed_at());
        std::fs::write(&existing, "earlier run\n").unwrap();

        let err = merger
            .merge(&sizes(&[3072]), &validation(&[3072], &[]), completed_at())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MergeError::Create { ref source, .. } if source.kind() == io::ErrorKind::AlreadyExists
        ));
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "earlier run\n");
        // Nothing was merged, so nothing was cleaned up.
        assert!(artifacts.result(SizeClass::new(3072)).exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_fatal() {
        let work = tempfile::tempdir().unwrap();
        let blocker = work.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let merger = Merger::new(ArtifactSet::new(work.path(), "moduli"), &blocker, "moduli");

        let err = merger
            .merge(&sizes(&[3072]), &validation(&[3072], &[]), completed_at())
            .await
            .unwrap_err();

        assert!(matches!(err, MergeError::Create { .. }));
    }
}
