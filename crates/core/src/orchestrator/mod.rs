//! Run orchestration.
//!
//! A run is a fixed sequence, each step a precondition for the next:
//! - **Preflight**: entropy check, fails before anything is launched
//! - **Generate**: one job per size class, bounded by the slot pool
//! - **Validate**: starts only after every generation job has finished
//! - **Merge**: validated results concatenated in ascending size order

mod runner;
mod types;

pub use runner::Orchestrator;
pub use types::{RunError, RunSummary};
