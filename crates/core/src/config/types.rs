use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Largest modulus size the external tool accepts.
pub const TOOL_MAX_BITS: u32 = 8192;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub preflight: PreflightConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Size-class range and slot scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Smallest size class in bits.
    #[serde(default = "default_min_bits")]
    pub min_bits: u32,
    /// Largest size class in bits (inclusive).
    #[serde(default = "default_max_bits")]
    pub max_bits: u32,
    /// Step between consecutive size classes.
    #[serde(default = "default_bit_delta")]
    pub bit_delta: u32,
    /// How often a blocked dispatcher re-checks the slot pool (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Overrides the detected physical core count. Still clamped to at least 1.
    #[serde(default)]
    pub max_slots: Option<usize>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_bits: default_min_bits(),
            max_bits: default_max_bits(),
            bit_delta: default_bit_delta(),
            poll_interval_ms: default_poll_interval(),
            max_slots: None,
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_min_bits() -> u32 {
    3072
}

fn default_max_bits() -> u32 {
    TOOL_MAX_BITS
}

fn default_bit_delta() -> u32 {
    1024
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

/// External generation/validation tool
///
/// Argument templates may reference `{bits}`, `{iterations}`, `{candidates}`
/// and `{result}`; each is substituted per job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolConfig {
    #[serde(default = "default_program")]
    pub program: PathBuf,
    #[serde(default = "default_generate_args")]
    pub generate_args: Vec<String>,
    #[serde(default = "default_validate_args")]
    pub validate_args: Vec<String>,
    /// Primality rounds passed through to the validation stage.
    #[serde(default = "default_iteration_count")]
    pub iteration_count: u32,
    /// Per-job wall clock limit in seconds (0 = unlimited).
    #[serde(default)]
    pub job_timeout_secs: u64,
    /// Drop spawned jobs to idle CPU and I/O priority.
    #[serde(default = "default_true")]
    pub demote_priority: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            generate_args: default_generate_args(),
            validate_args: default_validate_args(),
            iteration_count: default_iteration_count(),
            job_timeout_secs: 0,
            demote_priority: true,
        }
    }
}

impl ToolConfig {
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

fn default_program() -> PathBuf {
    PathBuf::from("ssh-keygen")
}

fn default_generate_args() -> Vec<String> {
    ["-M", "generate", "-O", "bits={bits}", "{candidates}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_validate_args() -> Vec<String> {
    [
        "-M",
        "screen",
        "-O",
        "prime-rounds={iterations}",
        "-f",
        "{candidates}",
        "{result}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_iteration_count() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

/// Host entropy precondition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreflightConfig {
    /// Minimum acceptable entropy estimate (out of a 4096 reference maximum).
    /// 0 skips the check.
    #[serde(default = "default_entropy_minimum")]
    pub entropy_minimum: u32,
    #[serde(default = "default_entropy_path")]
    pub entropy_path: PathBuf,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            entropy_minimum: default_entropy_minimum(),
            entropy_path: default_entropy_path(),
        }
    }
}

fn default_entropy_minimum() -> u32 {
    2000
}

fn default_entropy_path() -> PathBuf {
    PathBuf::from("/proc/sys/kernel/random/entropy_avail")
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory holding intermediate candidate and result files.
    #[serde(default = "default_dir")]
    pub work_dir: PathBuf,
    /// Directory receiving the merged, timestamped output.
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,
    /// File name prefix shared by intermediate and merged artifacts.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Leave intermediate files of failed size classes on disk for inspection.
    #[serde(default = "default_true")]
    pub keep_failed_artifacts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: default_dir(),
            output_dir: default_dir(),
            prefix: default_prefix(),
            keep_failed_artifacts: true,
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_prefix() -> String {
    "moduli".to_string()
}

/// Metrics export
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write a Prometheus text-format snapshot here when the run ends
    /// (suitable for the node_exporter textfile collector).
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.schedule.min_bits, 3072);
        assert_eq!(config.schedule.max_bits, 8192);
        assert_eq!(config.schedule.bit_delta, 1024);
        assert_eq!(config.schedule.poll_interval_ms, 5000);
        assert_eq!(config.tool.iteration_count, 100);
        assert_eq!(config.preflight.entropy_minimum, 2000);
        assert_eq!(config.tool.program, PathBuf::from("ssh-keygen"));
        assert!(config.tool.demote_priority);
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let toml = r#"
[schedule]
min_bits = 2048
max_bits = 4096

[tool]
iteration_count = 64
job_timeout_secs = 600
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.schedule.min_bits, 2048);
        assert_eq!(config.schedule.max_bits, 4096);
        assert_eq!(config.schedule.bit_delta, 1024);
        assert_eq!(config.tool.iteration_count, 64);
        assert_eq!(config.tool.job_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.output.prefix, "moduli");
    }

    #[test]
    fn test_zero_timeout_is_unlimited() {
        let tool = ToolConfig::default();
        assert_eq!(tool.job_timeout(), None);
    }

    #[test]
    fn test_default_templates_reference_artifacts() {
        let tool = ToolConfig::default();
        assert!(tool.generate_args.iter().any(|a| a.contains("{bits}")));
        assert!(tool.generate_args.iter().any(|a| a.contains("{candidates}")));
        assert!(tool.validate_args.iter().any(|a| a.contains("{iterations}")));
        assert!(tool.validate_args.iter().any(|a| a.contains("{result}")));
    }

    #[test]
    fn test_poll_interval_conversion() {
        let schedule = ScheduleConfig {
            poll_interval_ms: 250,
            ..Default::default()
        };
        assert_eq!(schedule.poll_interval(), Duration::from_millis(250));
    }
}
