//! Merge behavior when the output stops accepting writes part way through.
//!
//! Lowers the process file size limit, so it lives in its own test binary
//! and holds a single test.

#![cfg(target_os = "linux")]

use std::time::Duration;

use modforge_core::{
    ArtifactSet, JobExit, JobResult, MergeWarning, Merger, SizeClass, Stage, StageReport,
};

/// Caps the size of any file this process writes until dropped.
struct FileSizeLimit {
    previous: libc::rlimit,
}

impl FileSizeLimit {
    fn set(max_bytes: u64) -> Self {
        unsafe {
            // Exceeding the limit must fail the write, not kill the process.
            libc::signal(libc::SIGXFSZ, libc::SIG_IGN);

            let mut previous: libc::rlimit = std::mem::zeroed();
            assert_eq!(libc::getrlimit(libc::RLIMIT_FSIZE, &mut previous), 0);
            let limited = libc::rlimit {
                rlim_cur: max_bytes as libc::rlim_t,
                rlim_max: previous.rlim_max,
            };
            assert_eq!(libc::setrlimit(libc::RLIMIT_FSIZE, &limited), 0);
            Self { previous }
        }
    }
}

impl Drop for FileSizeLimit {
    fn drop(&mut self) {
        unsafe {
            libc::setrlimit(libc::RLIMIT_FSIZE, &self.previous);
        }
    }
}

fn passed(bits: &[u32]) -> StageReport {
    let results: Vec<JobResult> = bits
        .iter()
        .map(|&b| {
            JobResult::from_outcome(
                Stage::Validate,
                SizeClass::new(b),
                Ok(JobExit::success(Duration::ZERO)),
            )
        })
        .collect();
    StageReport {
        stage: Stage::Validate,
        dispatch_order: results.iter().map(|r| r.size_class).collect(),
        results,
        peak_in_flight: 1,
        elapsed_ms: 0,
    }
}

#[tokio::test]
async fn test_failed_append_is_charged_to_its_size_and_cut_from_output() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let artifacts = ArtifactSet::new(work.path(), "moduli");

    // 12 + 21 bytes crosses a 24 byte limit; 12 + 12 fits exactly.
    let contents = [
        (3072, "result 3072\n"),
        (4096, "result 4096 extended\n"),
        (5120, "result 5120\n"),
    ];
    for (bits, body) in contents {
        std::fs::write(artifacts.result(SizeClass::new(bits)), body).unwrap();
    }
    let sizes: Vec<SizeClass> = contents.iter().map(|&(b, _)| SizeClass::new(b)).collect();
    let merger = Merger::new(artifacts.clone(), out.path(), "moduli");

    let result = {
        let _limit = FileSizeLimit::set(24);
        merger
            .merge(&sizes, &passed(&[3072, 4096, 5120]), chrono::Local::now())
            .await
    };
    let report = result.unwrap();

    let merged = std::fs::read_to_string(&report.output).unwrap();
    assert_eq!(merged, "result 3072\nresult 5120\n");
    assert_eq!(report.bytes_written, 24);
    assert_eq!(report.merged, vec![SizeClass::new(3072), SizeClass::new(5120)]);
    assert_eq!(report.skipped, vec![SizeClass::new(4096)]);
    assert!(matches!(
        report.warnings.as_slice(),
        [MergeWarning::AppendFailed { size_class, .. }] if size_class.bits() == 4096
    ));

    // The size that failed keeps its artifact; merged ones are cleaned up.
    assert!(artifacts.result(SizeClass::new(4096)).exists());
    assert!(!artifacts.result(SizeClass::new(3072)).exists());
    assert!(!artifacts.result(SizeClass::new(5120)).exists());
}
