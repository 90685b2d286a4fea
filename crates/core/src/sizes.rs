//! Size classes: the bit lengths a run generates and screens moduli for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One modulus bit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeClass(u32);

impl SizeClass {
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `[min, min + delta, min + 2*delta, ...]` capped at `max` inclusive.
    ///
    /// Empty when `min > max`. A zero `delta` yields `[min]` rather than looping.
    pub fn sequence(min: u32, max: u32, delta: u32) -> Vec<SizeClass> {
        if min > max {
            return Vec::new();
        }
        if delta == 0 {
            return vec![SizeClass(min)];
        }

        let mut sizes = Vec::with_capacity(((max - min) / delta + 1) as usize);
        let mut bits = min;
        loop {
            sizes.push(SizeClass(bits));
            match bits.checked_add(delta) {
                Some(next) if next <= max => bits = next,
                _ => break,
            }
        }
        sizes
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for SizeClass {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}
