//! Acceptability policy
//!
//! Decides whether the trend between two samples is healthy. The policy is
//! stateless; callers apply the verdict (trip the breaker, alert).
//!
//! # Rules
//! 1. `current.ratio <= minimum_ratio` rejects, whatever the history.
//! 2. No previous sample accepts.
//! 3. A zero allowance, a non-negative buffer change, or a drop within
//!    `max_buffer_decrease_mb` MiB accepts.
//! 4. Anything else rejects.

use crate::delta::Delta;
use crate::ratio::RatioTargets;
use crate::snapshot::Snapshot;
use crate::MIB;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-tracker policy thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyThresholds {
    /// Ratio at or below which the tracker is rejected
    pub minimum_ratio: f64,
    /// Largest tolerated buffer drop per period, in MiB (0 = unbounded)
    pub max_buffer_decrease_mb: u64,
}

impl PolicyThresholds {
    /// Create thresholds
    #[inline]
    #[must_use]
    pub fn new(minimum_ratio: f64, max_buffer_decrease_mb: u64) -> Self {
        Self {
            minimum_ratio,
            max_buffer_decrease_mb,
        }
    }

    /// Allowance in bytes
    #[inline]
    #[must_use]
    pub fn max_decrease_bytes(&self) -> u64 {
        self.max_buffer_decrease_mb.saturating_mul(MIB)
    }
}

/// Why a tracker was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Absolute ratio at or below the configured minimum
    RatioBelowMinimum,
    /// Buffer dropped more than allowed since the previous sample
    BufferDropExceeded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RatioBelowMinimum => f.write_str("ratio dropped below the minimum authorized"),
            Self::BufferDropExceeded => f.write_str("buffer dropped more than allowed"),
        }
    }
}

/// Policy outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Trend acceptable
    Accept,
    /// Trend unacceptable
    Reject(RejectReason),
}

impl Verdict {
    /// Check if accepted
    #[inline]
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Rejection reason, if any
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accept => None,
            Self::Reject(reason) => Some(*reason),
        }
    }
}

/// Evaluate `current` against `previous`
#[must_use]
pub fn evaluate(
    current: &Snapshot,
    previous: Option<&Snapshot>,
    thresholds: &PolicyThresholds,
    targets: &RatioTargets,
) -> Verdict {
    if current.ratio <= thresholds.minimum_ratio {
        tracing::info!(
            tracker = %current.tracker,
            ratio = current.ratio,
            minimum = thresholds.minimum_ratio,
            "ratio has dropped below minimum authorized, unacceptable"
        );
        return Verdict::Reject(RejectReason::RatioBelowMinimum);
    }

    let Some(previous) = previous else {
        // first pass
        return Verdict::Accept;
    };

    let change = Delta::diff(current, previous, targets).buffer;
    let allowed = thresholds.max_decrease_bytes();
    if thresholds.max_buffer_decrease_mb == 0 || change >= 0 || change.unsigned_abs() <= allowed {
        return Verdict::Accept;
    }

    tracing::info!(
        tracker = %current.tracker,
        decrease = change,
        allowed,
        "buffer decrease exceeds allowance, unacceptable"
    );
    Verdict::Reject(RejectReason::BufferDropExceeded)
}
