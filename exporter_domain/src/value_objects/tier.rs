// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Update-frequency tiers: Fast, Medium, Slow.

use crate::error::ExporterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A closed enumeration of the three scheduling tiers.
///
/// Bounds are enforced at config load time by [`Tier::validate_periods`], not
/// by this type itself — a `Tier` value carries no period, only an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Fast,
    Medium,
    Slow,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Fast, Tier::Medium, Tier::Slow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Medium => "medium",
            Tier::Slow => "slow",
        }
    }

    /// Validates the three configured periods against §3's bounds and
    /// relationships: Fast ∈ [30,300]s, Medium ∈ [300,1800]s and a multiple
    /// of Fast, Slow ∈ [600,3600]s and ≥ Medium.
    pub fn validate_periods(fast: Duration, medium: Duration, slow: Duration) -> Result<(), ExporterError> {
        let fast_s = fast.as_secs();
        let medium_s = medium.as_secs();
        let slow_s = slow.as_secs();

        if !(30..=300).contains(&fast_s) {
            return Err(ExporterError::validation(format!(
                "intervals.fast must be within [30,300]s, got {fast_s}"
            )));
        }
        if !(300..=1800).contains(&medium_s) {
            return Err(ExporterError::validation(format!(
                "intervals.medium must be within [300,1800]s, got {medium_s}"
            )));
        }
        if medium_s < fast_s {
            return Err(ExporterError::validation(format!(
                "intervals.medium ({medium_s}s) must be >= intervals.fast ({fast_s}s)"
            )));
        }
        if medium_s % fast_s != 0 {
            return Err(ExporterError::validation(format!(
                "intervals.medium ({medium_s}s) must be an integer multiple of intervals.fast ({fast_s}s)"
            )));
        }
        if !(600..=3600).contains(&slow_s) {
            return Err(ExporterError::validation(format!(
                "intervals.slow must be within [600,3600]s, got {slow_s}"
            )));
        }
        if slow_s < medium_s {
            return Err(ExporterError::validation(format!(
                "intervals.slow ({slow_s}s) must be >= intervals.medium ({medium_s}s)"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Tier::validate_periods(Duration::from_secs(60), Duration::from_secs(300), Duration::from_secs(900))
            .is_ok());
    }

    #[test]
    fn medium_must_be_multiple_of_fast() {
        let result =
            Tier::validate_periods(Duration::from_secs(45), Duration::from_secs(300), Duration::from_secs(900));
        assert!(result.is_err());
    }

    #[test]
    fn boundary_periods_are_accepted() {
        // Fast at its lower bound must still be valid (invariant 6 of §8
        // depends on this holding together with the 0.9x deadline rule).
        assert!(Tier::validate_periods(Duration::from_secs(30), Duration::from_secs(300), Duration::from_secs(600))
            .is_ok());
    }

    #[test]
    fn slow_below_medium_is_rejected() {
        let result =
            Tier::validate_periods(Duration::from_secs(60), Duration::from_secs(600), Duration::from_secs(599));
        assert!(result.is_err());
    }
}
