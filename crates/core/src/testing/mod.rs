//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the [`Launcher`] and
//! [`Host`] traits so a whole run can be exercised without the external
//! tool or real host facts.
//!
//! # Example
//!
//! ```rust,ignore
//! use modforge_core::testing::{fixtures, MockHost, MockLauncher};
//!
//! let dir = tempfile::tempdir()?;
//! let launcher = MockLauncher::new();
//! let orchestrator = Orchestrator::new(
//!     fixtures::config_in(dir.path()),
//!     Arc::new(MockHost::default()),
//!     Arc::new(launcher.clone()),
//! );
//! let summary = orchestrator.run().await?;
//! ```
//!
//! [`Launcher`]: crate::launcher::Launcher
//! [`Host`]: crate::host::Host

mod mock_host;
mod mock_launcher;

pub use mock_host::MockHost;
pub use mock_launcher::{JobEvent, JobEventKind, MockLauncher};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::Config;

    /// Default configuration with artifacts under `root/work` and output
    /// under `root/out`, polling fast enough for tests.
    pub fn config_in(root: &Path) -> Config {
        let mut config = Config::default();
        config.output.work_dir = root.join("work");
        config.output.output_dir = root.join("out");
        config.schedule.poll_interval_ms = 10;
        config
    }

    /// Same as [`config_in`] with an explicit size range.
    pub fn config_with_range(root: &Path, min_bits: u32, max_bits: u32, bit_delta: u32) -> Config {
        let mut config = config_in(root);
        config.schedule.min_bits = min_bits;
        config.schedule.max_bits = max_bits;
        config.schedule.bit_delta = bit_delta;
        config
    }
}
