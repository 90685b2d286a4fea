//! Operator-facing rendering of plans and run summaries.

use std::io::{self, Write};

use modforge_core::{Job, RunSummary, StageReport};

pub fn write_plan(out: &mut impl Write, jobs: &[Job]) -> io::Result<()> {
    for job in jobs {
        writeln!(
            out,
            "{}\t{} {}",
            job.id(),
            job.program.display(),
            job.args.join(" ")
        )?;
    }
    Ok(())
}

pub fn write_summary(out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
    let sizes = &summary.size_classes;
    let range = match (sizes.first(), sizes.last()) {
        (Some(first), Some(last)) => format!("{first}..{last}"),
        _ => "none".to_string(),
    };

    writeln!(out, "Output:       {}", summary.output_path().display())?;
    writeln!(
        out,
        "Size classes: {} ({}), {} slots",
        sizes.len(),
        range,
        summary.capacity
    )?;
    write_stage(out, "Generated:   ", &summary.generation)?;
    write_stage(out, "Validated:   ", &summary.validation)?;
    writeln!(
        out,
        "Merged:       {} size classes, {} bytes",
        summary.merge.merged.len(),
        summary.merge.bytes_written
    )?;

    let warnings = summary.warnings();
    if !warnings.is_empty() {
        writeln!(out, "Warnings:")?;
        for warning in warnings {
            writeln!(out, "  {warning}")?;
        }
    }
    Ok(())
}

fn write_stage(out: &mut impl Write, label: &str, report: &StageReport) -> io::Result<()> {
    writeln!(
        out,
        "{} {} succeeded, {} failed ({:.1}s)",
        label,
        report.succeeded(),
        report.failed(),
        report.elapsed_ms as f64 / 1000.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use modforge_core::{JobError, JobResult, JobState, MergeReport, MergeWarning, SizeClass, Stage};
    use std::path::PathBuf;

    fn stage(stage: Stage, ok: &[u32], failed: &[u32]) -> StageReport {
        let mut results: Vec<JobResult> = ok
            .iter()
            .map(|&b| JobResult {
                state: JobState::Succeeded,
                exit_code: Some(0),
                ..JobResult::pending(stage, SizeClass::new(b))
            })
            .collect();
        results.extend(failed.iter().map(|&b| {
            JobResult::failed(stage, SizeClass::new(b), JobError::NonZeroExit { code: 1 })
        }));
        StageReport {
            stage,
            dispatch_order: results.iter().map(|r| r.size_class).collect(),
            results,
            peak_in_flight: 2,
            elapsed_ms: 2500,
        }
    }

    #[test]
    fn test_write_summary_with_warning() {
        let summary = RunSummary {
            started_at: Local::now(),
            completed_at: Local::now(),
            entropy_available: 3500,
            capacity: 2,
            size_classes: vec![SizeClass::new(3072), SizeClass::new(4096)],
            generation: stage(Stage::Generate, &[3072, 4096], &[]),
            validation: stage(Stage::Validate, &[3072], &[4096]),
            merge: MergeReport {
                output: PathBuf::from("/out/moduli-20260101-120000"),
                merged: vec![SizeClass::new(3072)],
                skipped: vec![SizeClass::new(4096)],
                warnings: vec![MergeWarning::ValidationFailed {
                    size_class: SizeClass::new(4096),
                }],
                bytes_written: 120,
            },
        };

        let mut out = Vec::new();
        write_summary(&mut out, &summary).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Output:       /out/moduli-20260101-120000"));
        assert!(text.contains("Size classes: 2 (3072..4096), 2 slots"));
        assert!(text.contains("Validated:    1 succeeded, 1 failed (2.5s)"));
        assert!(text.contains("Merged:       1 size classes, 120 bytes"));
        assert!(text.contains("  validate 4096: exited with code 1"));
    }

    #[test]
    fn test_write_plan() {
        let job = Job {
            stage: Stage::Generate,
            size_class: SizeClass::new(3072),
            program: PathBuf::from("ssh-keygen"),
            args: vec!["-M".into(), "generate".into()],
            input: None,
            output: PathBuf::from("moduli-3072.candidates"),
        };

        let mut out = Vec::new();
        write_plan(&mut out, &[job]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "generate-3072\tssh-keygen -M generate\n"
        );
    }
}
