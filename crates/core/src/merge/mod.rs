//! Final concatenation of validated results into one timestamped file.
//!
//! Result artifacts are appended in ascending size-class order regardless of
//! the order their jobs completed. Only failing to create the output is
//! fatal; a size class that cannot be merged is skipped with a warning.

mod merger;
mod types;

pub use merger::Merger;
pub use types::{MergeError, MergeReport, MergeWarning};
