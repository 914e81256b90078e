//! Seedwatch Stats - tracker health time series
//!
//! Pure data and arithmetic for the tracker health engine:
//! - [`Snapshot`]: one timestamped sample of a tracker's counters
//! - [`RatioTargets`] and [`Buffers`]: derived buffer metrics
//! - [`Delta`]: signed difference between two snapshots
//! - [`evaluate`]: the acceptability policy behind the circuit breaker
//! - [`interpolate`]: synthetic snapshots between two real samples
//! - [`daily_rollup`]: start-of-day/week/month markers
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use seedwatch_stats::{evaluate, PolicyThresholds, RatioTargets, Snapshot, Verdict, MIB};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let before = Snapshot::collected("blue", 1000 * MIB, 1000 * MIB, 1.0, t0);
//! let after = Snapshot::collected("blue", 1050 * MIB, 2000 * MIB, 0.95, t0 + Duration::hours(1));
//!
//! let thresholds = PolicyThresholds::new(0.6, 100);
//! let verdict = evaluate(&after, Some(&before), &thresholds, &RatioTargets::default());
//! assert!(matches!(verdict, Verdict::Reject(_)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod bytes;
mod delta;
mod error;
mod interpolate;
mod policy;
mod progress;
mod ratio;
mod rollup;
mod snapshot;

// Re-exports
pub use bytes::{readable_signed, readable_unsigned, ByteSize};
pub use delta::{delta_series, Delta};
pub use error::StatsError;
pub use interpolate::interpolate;
pub use policy::{evaluate, PolicyThresholds, RejectReason, Verdict};
pub use progress::{describe, to_row, RowMarker, ROW_TIMESTAMP_FORMAT};
pub use ratio::{derive_buffers, Buffers, RatioTargets, DEFAULT_TARGET_RATIO, WARNING_RATIO};
pub use rollup::{daily_rollup, start_of_day};
pub use snapshot::{Counters, Snapshot, SCHEMA_VERSION};

/// One mebibyte, the unit of the buffer decrease allowance
pub const MIB: u64 = 1024 * 1024;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
