//! Snapshot deltas
//!
//! Provides [`Delta`], the signed difference between two samples of the same
//! tracker. [`Delta::diff`] is plain elementwise subtraction and is what the
//! progress report and the policy use. [`Delta::between`] is the checked
//! form used when building time series, and refuses out-of-order pairs.

use crate::error::StatsError;
use crate::ratio::RatioTargets;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difference between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Tracker label (from the later snapshot)
    pub tracker: String,
    /// Timestamp of the later snapshot
    pub timestamp: DateTime<Utc>,
    /// Uploaded bytes difference
    pub uploaded: i64,
    /// Downloaded bytes difference
    pub downloaded: i64,
    /// Ratio difference
    pub ratio: f64,
    /// Buffer difference
    pub buffer: i64,
    /// Warning buffer difference
    pub warning_buffer: i64,
}

impl Delta {
    /// Elementwise `current - previous`
    ///
    /// No ordering is enforced: `diff(a, b)` is the additive inverse of
    /// `diff(b, a)` on every numeric field.
    #[must_use]
    pub fn diff(current: &Snapshot, previous: &Snapshot, targets: &RatioTargets) -> Self {
        let now = current.buffers(targets);
        let before = previous.buffers(targets);
        Self {
            tracker: current.tracker.clone(),
            timestamp: current.timestamp,
            uploaded: signed_diff(current.uploaded, previous.uploaded),
            downloaded: signed_diff(current.downloaded, previous.downloaded),
            ratio: current.ratio - previous.ratio,
            buffer: now.buffer.saturating_sub(before.buffer),
            warning_buffer: now.warning_buffer.saturating_sub(before.warning_buffer),
        }
    }

    /// Checked delta from `earlier` to `later`
    ///
    /// # Errors
    /// Returns [`StatsError::NonMonotonicDelta`] unless `later` is strictly
    /// after `earlier`
    pub fn between(
        earlier: &Snapshot,
        later: &Snapshot,
        targets: &RatioTargets,
    ) -> Result<Self, StatsError> {
        if later.timestamp <= earlier.timestamp {
            return Err(StatsError::NonMonotonicDelta {
                earlier: earlier.timestamp,
                later: later.timestamp,
            });
        }
        Ok(Self::diff(later, earlier, targets))
    }

    /// All-zero delta anchored at a snapshot
    #[must_use]
    pub fn zero(at: &Snapshot) -> Self {
        Self {
            tracker: at.tracker.clone(),
            timestamp: at.timestamp,
            uploaded: 0,
            downloaded: 0,
            ratio: 0.0,
            buffer: 0,
            warning_buffer: 0,
        }
    }
}

/// One delta per entry of a time-ordered run
///
/// The first entry has nothing to compare against and yields a zero delta;
/// an out-of-order neighbour also yields a zero delta.
#[must_use]
pub fn delta_series(entries: &[Snapshot], targets: &RatioTargets) -> Vec<Delta> {
    let mut deltas = Vec::with_capacity(entries.len());
    let Some(first) = entries.first() else {
        return deltas;
    };
    deltas.push(Delta::zero(first));

    for pair in entries.windows(2) {
        match Delta::between(&pair[0], &pair[1], targets) {
            Ok(delta) => deltas.push(delta),
            Err(e) => {
                tracing::debug!(
                    tracker = %pair[1].tracker,
                    error = %e,
                    "zero delta for unordered entry"
                );
                deltas.push(Delta::zero(&pair[1]));
            }
        }
    }
    deltas
}

fn signed_diff(a: u64, b: u64) -> i64 {
    let d = i128::from(a) - i128::from(b);
    i64::try_from(d).unwrap_or(if d < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MIB;
    use chrono::{Duration, TimeZone};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn diff_against_empty_sample() {
        let targets = RatioTargets::default();
        let empty = Snapshot::collected("blue", 0, 0, 0.0, at(0));
        let s2 = Snapshot::collected("blue", 1000 * MIB, 1000 * MIB, 1.0, at(1));

        let d = Delta::diff(&s2, &empty, &targets);
        assert_eq!(d.uploaded, (1000 * MIB) as i64);
        assert_eq!(d.downloaded, (1000 * MIB) as i64);
        assert_eq!(d.buffer, 0);
        assert_eq!(d.ratio, 1.0);
    }

    #[test]
    fn diff_tracks_buffer_drop() {
        let targets = RatioTargets::default();
        let s2 = Snapshot::collected("blue", 1000 * MIB, 1000 * MIB, 1.0, at(0));
        let s3 = Snapshot::collected("blue", 1050 * MIB, 2000 * MIB, 0.95, at(1));

        let d = Delta::diff(&s3, &s2, &targets);
        assert_eq!(d.uploaded, (50 * MIB) as i64);
        assert_eq!(d.downloaded, (1000 * MIB) as i64);
        assert_eq!(d.buffer, -950 * MIB as i64);
        assert!((d.ratio + 0.05).abs() < 1e-3);
        assert_eq!(d.timestamp, s3.timestamp);
    }

    #[test]
    fn between_refuses_equal_and_reversed_timestamps() {
        let targets = RatioTargets::default();
        let a = Snapshot::collected("blue", 1, 1, 1.0, at(2));
        let b = Snapshot::collected("blue", 2, 2, 1.0, at(2));
        let c = Snapshot::collected("blue", 3, 3, 1.0, at(1));

        assert!(matches!(
            Delta::between(&a, &b, &targets),
            Err(StatsError::NonMonotonicDelta { .. })
        ));
        assert!(Delta::between(&a, &c, &targets).is_err());
        assert!(Delta::between(&c, &a, &targets).is_ok());
    }

    #[test]
    fn series_starts_with_zero_delta() {
        let targets = RatioTargets::default();
        let entries = vec![
            Snapshot::collected("blue", 10 * MIB, 5 * MIB, 2.0, at(0)),
            Snapshot::collected("blue", 20 * MIB, 5 * MIB, 4.0, at(24)),
            Snapshot::collected("blue", 25 * MIB, 15 * MIB, 1.6, at(48)),
        ];
        let series = delta_series(&entries, &targets);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0], Delta::zero(&entries[0]));
        assert_eq!(series[1].uploaded, (10 * MIB) as i64);
        assert_eq!(series[2].downloaded, (10 * MIB) as i64);
    }

    #[test]
    fn series_zeroes_unordered_entries() {
        let targets = RatioTargets::default();
        let entries = vec![
            Snapshot::collected("blue", 10, 5, 2.0, at(5)),
            Snapshot::collected("blue", 20, 5, 4.0, at(1)),
        ];
        let series = delta_series(&entries, &targets);
        assert_eq!(series[1], Delta::zero(&entries[1]));
        assert!(delta_series(&[], &targets).is_empty());
    }

    #[test]
    fn signed_diff_saturates() {
        assert_eq!(signed_diff(u64::MAX, 0), i64::MAX);
        assert_eq!(signed_diff(0, u64::MAX), i64::MIN);
        assert_eq!(signed_diff(5, 7), -2);
    }
}
