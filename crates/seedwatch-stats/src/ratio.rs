//! Ratio targets and buffer derivation
//!
//! The buffer is the amount of data a tracker account can still download
//! while staying at its target ratio. The warning buffer is the same figure
//! at the more lenient [`WARNING_RATIO`].

use crate::error::StatsError;
use serde::{Deserialize, Serialize};

/// Ratio below which trackers start warning their users
pub const WARNING_RATIO: f64 = 0.6;

/// Target ratio used when a tracker does not configure one
pub const DEFAULT_TARGET_RATIO: f64 = 1.0;

/// Ratio pair used to derive buffers
///
/// # Invariants
/// - `target > warning > 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioTargets {
    target: f64,
    warning: f64,
}

impl RatioTargets {
    /// Create validated ratio targets
    ///
    /// # Errors
    /// Returns [`StatsError::InvalidRatios`] unless `target > warning > 0`
    pub fn new(target: f64, warning: f64) -> Result<Self, StatsError> {
        if !(warning > 0.0 && target > warning) {
            return Err(StatsError::InvalidRatios { target, warning });
        }
        Ok(Self { target, warning })
    }

    /// Targets for a tracker ratio, with the global warning ratio
    ///
    /// # Errors
    /// Returns [`StatsError::InvalidRatios`] if `target <= WARNING_RATIO`
    #[inline]
    pub fn with_target(target: f64) -> Result<Self, StatsError> {
        Self::new(target, WARNING_RATIO)
    }

    /// Target ratio
    #[inline]
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Warning ratio
    #[inline]
    #[must_use]
    pub fn warning(&self) -> f64 {
        self.warning
    }
}

impl Default for RatioTargets {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET_RATIO,
            warning: WARNING_RATIO,
        }
    }
}

/// Buffer metrics derived from cumulative counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buffers {
    /// `floor(uploaded / target) - downloaded`
    pub buffer: i64,
    /// `floor(uploaded / warning) - downloaded`
    pub warning_buffer: i64,
}

/// Derive buffer and warning buffer from counters
#[must_use]
pub fn derive_buffers(uploaded: u64, downloaded: u64, targets: &RatioTargets) -> Buffers {
    let downloaded = i64::try_from(downloaded).unwrap_or(i64::MAX);
    Buffers {
        buffer: allowance(uploaded, targets.target).saturating_sub(downloaded),
        warning_buffer: allowance(uploaded, targets.warning).saturating_sub(downloaded),
    }
}

// Float-to-int `as` saturates, which is the behavior we want for huge counters.
fn allowance(uploaded: u64, ratio: f64) -> i64 {
    (uploaded as f64 / ratio).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MIB;

    #[test]
    fn targets_reject_inverted_pair() {
        assert!(RatioTargets::new(0.5, 0.6).is_err());
        assert!(RatioTargets::new(0.6, 0.6).is_err());
        assert!(RatioTargets::new(1.0, 0.0).is_err());
        assert!(RatioTargets::new(1.0, 0.6).is_ok());
    }

    #[test]
    fn default_targets() {
        let targets = RatioTargets::default();
        assert_eq!(targets.target(), DEFAULT_TARGET_RATIO);
        assert_eq!(targets.warning(), WARNING_RATIO);
    }

    #[test]
    fn buffers_at_unit_target() {
        let buffers = derive_buffers(1000 * MIB, 1000 * MIB, &RatioTargets::default());
        assert_eq!(buffers.buffer, 0);
        // 1000 MiB / 0.6 = 1666.66 MiB
        assert_eq!(buffers.warning_buffer, (1000.0 * MIB as f64 / 0.6).floor() as i64 - (1000 * MIB) as i64);
    }

    #[test]
    fn buffers_go_negative_on_deficit() {
        let buffers = derive_buffers(1050 * MIB, 2000 * MIB, &RatioTargets::default());
        assert_eq!(buffers.buffer, -950 * MIB as i64);
    }

    #[test]
    fn higher_target_shrinks_buffer() {
        let strict = RatioTargets::with_target(2.0).unwrap();
        let buffers = derive_buffers(100 * MIB, 10 * MIB, &strict);
        assert_eq!(buffers.buffer, 40 * MIB as i64);
    }
}
