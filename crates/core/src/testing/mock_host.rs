//! Mock host for testing.

use std::io;

use crate::host::Host;

/// Host with fixed entropy and core count.
#[derive(Debug, Clone)]
pub struct MockHost {
    entropy: Option<u32>,
    cores: usize,
}

impl MockHost {
    pub fn new(entropy: u32, cores: usize) -> Self {
        Self {
            entropy: Some(entropy),
            cores,
        }
    }

    /// A host whose entropy estimate cannot be read.
    pub fn unreadable(cores: usize) -> Self {
        Self {
            entropy: None,
            cores,
        }
    }
}

impl Default for MockHost {
    /// Plenty of entropy, four cores.
    fn default() -> Self {
        Self::new(4096, 4)
    }
}

impl Host for MockHost {
    fn entropy_available(&self) -> io::Result<u32> {
        self.entropy.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "entropy estimate unavailable")
        })
    }

    fn physical_cores(&self) -> usize {
        self.cores
    }
}
