//! Calendar roll-up
//!
//! Builds one synthetic start-of-day snapshot per UTC day so that daily,
//! weekly and monthly reports can be computed from a handful of entries
//! instead of every collected sample.

use crate::interpolate::interpolate;
use crate::snapshot::{Snapshot, SCHEMA_VERSION};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use std::collections::BTreeSet;

/// Midnight UTC of the day containing `ts`
#[must_use]
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&ts.date_naive().and_time(NaiveTime::MIN))
}

/// Missing start-of-day snapshots from the first collected sample until `today`
///
/// `collected` must be the tracker's collected samples, oldest first.
/// Days already present in `existing_days` (midnights) are skipped, as is
/// `today` itself and any day with no later sample to interpolate towards.
#[must_use]
pub fn daily_rollup(
    collected: &[Snapshot],
    existing_days: &BTreeSet<DateTime<Utc>>,
    today: DateTime<Utc>,
) -> Vec<Snapshot> {
    let mut created = Vec::new();
    let Some(first) = collected.first() else {
        return created;
    };
    let today = start_of_day(today);
    let mut day = start_of_day(first.timestamp);
    if day > today {
        tracing::warn!(tracker = %first.tracker, "incoherent daily stats: samples in the future");
        return created;
    }

    while day < today {
        if !existing_days.contains(&day) {
            match day_entry(collected, first, day) {
                Some(entry) => created.push(entry),
                // no sample after this midnight yet, nor after any later one
                None => break,
            }
        }
        day += Duration::days(1);
    }
    created
}

fn day_entry(collected: &[Snapshot], first: &Snapshot, day: DateTime<Utc>) -> Option<Snapshot> {
    let after = collected.partition_point(|s| s.timestamp < day);
    let next = collected.get(after)?;
    let previous = collected[..collected.partition_point(|s| s.timestamp <= day)]
        .last()
        .unwrap_or(first);

    let mut entry = if previous.timestamp == next.timestamp {
        Snapshot {
            id: 0,
            timestamp: day,
            collected: false,
            schema_version: SCHEMA_VERSION,
            ..previous.clone()
        }
    } else {
        match interpolate(previous, next, day) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(tracker = %previous.tracker, error = %e, "skipping daily entry");
                return None;
            }
        }
    };

    entry.start_of_day = true;
    entry.start_of_week = day.weekday() == Weekday::Mon;
    entry.start_of_month = day.day() == 1;
    Some(entry)
}
