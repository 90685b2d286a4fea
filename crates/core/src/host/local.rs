//! Host facts read from the running machine.

use std::io;
use std::path::PathBuf;

use super::traits::Host;

/// Reads entropy from procfs and core counts via `num_cpus`.
#[derive(Debug, Clone)]
pub struct LocalHost {
    entropy_path: PathBuf,
}

impl LocalHost {
    pub fn new(entropy_path: impl Into<PathBuf>) -> Self {
        Self {
            entropy_path: entropy_path.into(),
        }
    }

    fn parse_entropy(raw: &str) -> io::Result<u32> {
        raw.trim().parse::<u32>().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected entropy value {:?}: {}", raw.trim(), e),
            )
        })
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new("/proc/sys/kernel/random/entropy_avail")
    }
}

impl Host for LocalHost {
    fn entropy_available(&self) -> io::Result<u32> {
        let raw = std::fs::read_to_string(&self.entropy_path)?;
        Self::parse_entropy(&raw)
    }

    fn physical_cores(&self) -> usize {
        num_cpus::get_physical()
    }
}
