//! Prometheus metrics for a scheduling run.
//!
//! This module provides metrics for:
//! - Jobs (outcomes and durations per stage)
//! - Slot pool occupancy
//! - Merge results
//!
//! A run is a one-shot process, so metrics are exported by writing a
//! text-format snapshot (see [`write_textfile`]) rather than served.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::io;
use std::path::Path;

/// Registry holding every metric below.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Finished jobs by stage and result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("modforge_jobs_total", "Total finished jobs"),
        &["stage", "result"], // result: "succeeded", "failed"
    )
    .unwrap()
});

/// Job wall clock duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("modforge_job_duration_seconds", "Duration of external jobs")
            // Generation of large moduli routinely takes hours.
            .buckets(vec![
                1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0, 28800.0, 86400.0,
            ]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Slot Pool Metrics
// =============================================================================

pub static SLOT_CAPACITY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("modforge_slot_capacity", "Maximum concurrently running jobs").unwrap()
});

pub static SLOTS_OCCUPIED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("modforge_slots_occupied", "Currently occupied job slots").unwrap()
});

// =============================================================================
// Merge Metrics
// =============================================================================

/// Size classes written into a merged output.
pub static MERGED_SIZE_CLASSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "modforge_merged_size_classes_total",
        "Size classes included in merged output",
    )
    .unwrap()
});

/// Size classes left out of a merged output.
pub static SKIPPED_SIZE_CLASSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "modforge_skipped_size_classes_total",
        "Size classes excluded from merged output",
    )
    .unwrap()
});

/// Unix timestamp of the last completed run.
pub static LAST_RUN_TIMESTAMP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "modforge_last_run_timestamp_seconds",
        "Completion time of the last run",
    )
    .unwrap()
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(SLOT_CAPACITY.clone()),
        Box::new(SLOTS_OCCUPIED.clone()),
        Box::new(MERGED_SIZE_CLASSES.clone()),
        Box::new(SKIPPED_SIZE_CLASSES.clone()),
        Box::new(LAST_RUN_TIMESTAMP.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Writes a snapshot for the node_exporter textfile collector.
///
/// The file is written next to `path` and renamed into place so the
/// collector never reads a partial file.
pub fn write_textfile(path: &Path) -> io::Result<()> {
    let body = encode_metrics().map_err(io::Error::other)?;
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    std::fs::write(&staging, body)?;
    std::fs::rename(&staging, path)
}
