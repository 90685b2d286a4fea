//! Trait definitions for the host module.

use std::io;

/// Source of host facts the scheduler depends on.
pub trait Host: Send + Sync {
    /// Current kernel entropy estimate in bits.
    fn entropy_available(&self) -> io::Result<u32>;

    /// Physical cores across all sockets (sockets x cores-per-socket).
    /// May return 0 when detection fails.
    fn physical_cores(&self) -> usize;
}
