//! Bounded-parallelism stage scheduling.
//!
//! A [`SlotPool`] caps how many external jobs run at once. A [`StageRunner`]
//! drives one stage across every size class: it dispatches in ascending
//! order as slots free up, keeps each slot until its job's process exits,
//! and returns only once every dispatched job has finished.

mod report;
mod runner;
mod slots;

pub use report::{JobResult, StageReport};
pub use runner::StageRunner;
pub use slots::{SlotPermit, SlotPool};
