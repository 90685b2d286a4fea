//! Run preconditions checked before any job is dispatched.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PreflightConfig;

use super::traits::Host;

/// Reference maximum for the kernel entropy estimate.
pub const ENTROPY_REFERENCE_MAX: u32 = 4096;

/// Reasons the run refuses to start.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("insufficient entropy: {available} available, {minimum} required")]
    InsufficientEntropy { available: u32, minimum: u32 },

    #[error("cannot read entropy estimate from {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreflightError {
    /// Operator-facing remediation text.
    pub fn remediation(&self) -> String {
        let (headline, path) = match self {
            Self::InsufficientEntropy { available, minimum } => (
                format!(
                    "The kernel entropy pool holds {} bits; at least {} (of a maximum {}) are required.",
                    available, minimum, ENTROPY_REFERENCE_MAX
                ),
                None,
            ),
            Self::Unreadable { path, .. } => (
                "The kernel entropy estimate could not be read.".to_string(),
                Some(path),
            ),
        };
        let inspect = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "/proc/sys/kernel/random/entropy_avail".to_string());

        format!(
            "{headline}\n\
             Generating moduli draws heavily on system randomness.\n\
             Consider running an entropy daemon before retrying, for example:\n\
             \x20 - haveged\n\
             \x20 - rng-tools (rngd)\n\
             Inspect the current level with:\n\
             \x20 cat {inspect}\n\
             Set preflight.entropy_minimum = 0 to skip this check."
        )
    }
}

/// Verifies the host entropy estimate meets the configured minimum.
///
/// Returns the observed estimate, or 0 when the check is disabled.
pub fn preflight(host: &dyn Host, config: &PreflightConfig) -> Result<u32, PreflightError> {
    if config.entropy_minimum == 0 {
        debug!("Entropy preflight disabled");
        return Ok(0);
    }

    let available = host
        .entropy_available()
        .map_err(|source| PreflightError::Unreadable {
            path: config.entropy_path.clone(),
            source,
        })?;

    if available < config.entropy_minimum {
        return Err(PreflightError::InsufficientEntropy {
            available,
            minimum: config.entropy_minimum,
        });
    }

    debug!(available, minimum = config.entropy_minimum, "Entropy preflight passed");
    Ok(available)
}

/// Number of execution slots for the run: the override if given, otherwise the
/// detected physical core count, never less than 1.
pub fn slot_capacity(host: &dyn Host, max_slots: Option<usize>) -> usize {
    if let Some(slots) = max_slots {
        return slots.max(1);
    }
    match host.physical_cores() {
        0 => {
            warn!("Core detection returned 0; falling back to a single slot");
            1
        }
        cores => cores,
    }
}
