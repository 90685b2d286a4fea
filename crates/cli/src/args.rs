//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

use modforge_core::Config;

/// Default config file, used only when present.
pub const DEFAULT_CONFIG_PATH: &str = "modforge.toml";

/// Generate and screen DH moduli across size classes, one job per core.
#[derive(Parser, Debug)]
#[command(name = "modforge", version, about)]
pub struct Args {
    /// Configuration file. Without it, ./modforge.toml is used if present.
    #[arg(long, short, env = "MODFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Smallest size class in bits.
    #[arg(long)]
    pub min_bits: Option<u32>,

    /// Largest size class in bits (inclusive).
    #[arg(long)]
    pub max_bits: Option<u32>,

    /// Step between size classes in bits.
    #[arg(long)]
    pub bit_delta: Option<u32>,

    /// Primality rounds for the validation stage.
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Minimum entropy estimate required to start (0 skips the check).
    #[arg(long)]
    pub entropy_minimum: Option<u32>,

    /// Slot re-check interval while all slots are busy.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Run at most this many jobs at once instead of one per physical core.
    #[arg(long)]
    pub slots: Option<usize>,

    /// Directory for intermediate artifacts.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Directory for the merged output.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the jobs that would run and exit.
    #[arg(long)]
    pub plan: bool,
}

impl Args {
    /// Applies command line overrides on top of file and environment config.
    pub fn apply(&self, config: &mut Config) {
        let schedule = &mut config.schedule;
        if let Some(v) = self.min_bits {
            schedule.min_bits = v;
        }
        if let Some(v) = self.max_bits {
            schedule.max_bits = v;
        }
        if let Some(v) = self.bit_delta {
            schedule.bit_delta = v;
        }
        if let Some(v) = self.poll_interval_ms {
            schedule.poll_interval_ms = v;
        }
        if let Some(v) = self.slots {
            schedule.max_slots = Some(v);
        }
        if let Some(v) = self.iterations {
            config.tool.iteration_count = v;
        }
        if let Some(v) = self.entropy_minimum {
            config.preflight.entropy_minimum = v;
        }
        if let Some(dir) = &self.work_dir {
            config.output.work_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }
    }
}
