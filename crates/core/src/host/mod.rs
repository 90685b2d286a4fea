//! Host inspection: entropy pool level and CPU topology.
//!
//! Both feed the run before any job is dispatched: entropy gates the run via
//! [`preflight`], the physical core count sizes the slot pool via
//! [`slot_capacity`].

mod local;
mod preflight;
mod traits;

pub use local::LocalHost;
pub use preflight::{preflight, slot_capacity, PreflightError, ENTROPY_REFERENCE_MAX};
pub use traits::Host;
