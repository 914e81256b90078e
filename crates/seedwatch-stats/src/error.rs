//! Error types for tracker stats arithmetic

use chrono::{DateTime, Utc};

/// Errors raised by the stats model
///
/// All of these are caller errors: the engine never produces them from
/// well-formed, time-ordered samples.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    /// Later snapshot is not strictly after the earlier one
    #[error("cannot calculate delta for out of order entries: {earlier} is not before {later}")]
    NonMonotonicDelta {
        /// Timestamp of the snapshot expected to come first
        earlier: DateTime<Utc>,
        /// Timestamp of the snapshot expected to come second
        later: DateTime<Utc>,
    },

    /// Interpolation target outside of the bounding pair
    #[error("interpolation target {target} outside [{start}, {end}]")]
    InterpolationOutOfRange {
        /// Requested timestamp
        target: DateTime<Utc>,
        /// Timestamp of the earlier sample
        start: DateTime<Utc>,
        /// Timestamp of the later sample
        end: DateTime<Utc>,
    },

    /// Ratio targets violate `target > warning > 0`
    #[error("invalid ratios: target {target} must exceed warning {warning}, which must exceed 0")]
    InvalidRatios {
        /// Target ratio
        target: f64,
        /// Warning ratio
        warning: f64,
    },

    /// Legacy record could not be decoded
    #[error("malformed stats record: {0}")]
    MalformedRecord(String),
}
