//! Launcher module for starting external jobs.
//!
//! This module provides the `Launcher` trait and a `ProcessLauncher`
//! implementation that runs each job as an OS process:
//!
//! - Asynchronous start: `launch` returns a [`JobHandle`] as soon as the
//!   process exists
//! - Idle demotion of CPU and I/O priority right after spawn (best-effort)
//! - Captured stdout/stderr, retained for failure diagnostics
//! - Optional per-job wall clock limit
//!
//! # Example
//!
//! ```ignore
//! use modforge_core::launcher::{Launcher, LauncherConfig, ProcessLauncher};
//!
//! let launcher = ProcessLauncher::new(LauncherConfig::default());
//! let handle = launcher.launch(&job).await?;
//! let exit = handle.wait().await?;
//! if !exit.is_success() {
//!     eprintln!("{}", exit.stderr);
//! }
//! ```

mod config;
mod error;
mod priority;
mod process;
mod traits;
mod types;

pub use config::LauncherConfig;
pub use error::JobError;
pub use priority::demote_to_idle;
pub use process::ProcessLauncher;
pub use traits::Launcher;
pub use types::{JobExit, JobHandle};
