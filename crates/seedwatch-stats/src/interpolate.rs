//! Linear interpolation between samples

use crate::error::StatsError;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};

/// Synthesize a snapshot at `target` between two real samples
///
/// Uploaded, downloaded and ratio are interpolated independently. The result
/// keeps the tracker and schema version of `previous`, carries `target` as
/// its timestamp and is marked non-collected.
///
/// # Errors
/// Returns [`StatsError::InterpolationOutOfRange`] unless
/// `previous.timestamp <= target <= next.timestamp`
pub fn interpolate(
    previous: &Snapshot,
    next: &Snapshot,
    target: DateTime<Utc>,
) -> Result<Snapshot, StatsError> {
    if target < previous.timestamp || target > next.timestamp {
        return Err(StatsError::InterpolationOutOfRange {
            target,
            start: previous.timestamp,
            end: next.timestamp,
        });
    }

    let span = (next.timestamp - previous.timestamp).num_milliseconds();
    let fraction = if span == 0 {
        0.0
    } else {
        (target - previous.timestamp).num_milliseconds() as f64 / span as f64
    };

    Ok(Snapshot {
        id: 0,
        tracker: previous.tracker.clone(),
        uploaded: lerp_counter(previous.uploaded, next.uploaded, fraction),
        downloaded: lerp_counter(previous.downloaded, next.downloaded, fraction),
        ratio: previous.ratio + (next.ratio - previous.ratio) * fraction,
        timestamp: target,
        collected: false,
        start_of_day: false,
        start_of_week: false,
        start_of_month: false,
        schema_version: previous.schema_version,
    })
}

fn lerp_counter(from: u64, to: u64, fraction: f64) -> u64 {
    if fraction <= 0.0 {
        return from;
    }
    if fraction >= 1.0 {
        return to;
    }
    let value = from as f64 + (to as f64 - from as f64) * fraction;
    value.round().max(0.0) as u64
}
