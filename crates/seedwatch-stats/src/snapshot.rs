//! Tracker snapshots
//!
//! A [`Snapshot`] is one sample of a tracker account's cumulative counters.
//! Snapshots are immutable once created; the History Store assigns their
//! sequence id when persisting them.

use crate::error::StatsError;
use crate::ratio::{derive_buffers, Buffers, RatioTargets};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current persisted schema version of [`Snapshot`]
pub const SCHEMA_VERSION: u32 = 1;

/// Raw counters reported by a tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    /// Cumulative uploaded bytes
    pub uploaded: u64,
    /// Cumulative downloaded bytes
    pub downloaded: u64,
    /// Current share ratio
    pub ratio: f64,
}

impl Counters {
    /// Create counters
    #[inline]
    #[must_use]
    pub fn new(uploaded: u64, downloaded: u64, ratio: f64) -> Self {
        Self {
            uploaded,
            downloaded,
            ratio,
        }
    }
}

/// One sample for one tracker at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sequence id, assigned by the store (0 until persisted)
    pub id: u64,
    /// Tracker label
    pub tracker: String,
    /// Cumulative uploaded bytes
    pub uploaded: u64,
    /// Cumulative downloaded bytes
    pub downloaded: u64,
    /// Share ratio reported by the tracker
    pub ratio: f64,
    /// Sampling time
    pub timestamp: DateTime<Utc>,
    /// Real sample (true) or synthetic/interpolated one (false)
    pub collected: bool,
    /// First entry of its UTC day
    #[serde(default)]
    pub start_of_day: bool,
    /// First entry of its ISO week
    #[serde(default)]
    pub start_of_week: bool,
    /// First entry of its month
    #[serde(default)]
    pub start_of_month: bool,
    /// Persisted schema version
    #[serde(default)]
    pub schema_version: u32,
}

impl Snapshot {
    /// New collected sample from raw values
    #[must_use]
    pub fn collected(
        tracker: impl Into<String>,
        uploaded: u64,
        downloaded: u64,
        ratio: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            tracker: tracker.into(),
            uploaded,
            downloaded,
            ratio,
            timestamp,
            collected: true,
            start_of_day: false,
            start_of_week: false,
            start_of_month: false,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// New collected sample from tracker counters
    #[inline]
    #[must_use]
    pub fn from_counters(
        tracker: impl Into<String>,
        counters: Counters,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::collected(
            tracker,
            counters.uploaded,
            counters.downloaded,
            counters.ratio,
            timestamp,
        )
    }

    /// Raw counters of this sample
    #[inline]
    #[must_use]
    pub fn counters(&self) -> Counters {
        Counters::new(self.uploaded, self.downloaded, self.ratio)
    }

    /// Derived buffer metrics
    #[inline]
    #[must_use]
    pub fn buffers(&self, targets: &RatioTargets) -> Buffers {
        derive_buffers(self.uploaded, self.downloaded, targets)
    }

    /// Legacy row: `[unix_timestamp, uploaded, downloaded, ratio]`
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.timestamp.timestamp().to_string(),
            self.uploaded.to_string(),
            self.downloaded.to_string(),
            self.ratio.to_string(),
        ]
    }

    /// Decode a legacy row
    ///
    /// Decoded snapshots carry schema version 0; the History Store migrates
    /// them on the way in.
    ///
    /// # Errors
    /// Returns [`StatsError::MalformedRecord`] on wrong arity or unparsable fields
    pub fn from_record<S: AsRef<str>>(
        tracker: impl Into<String>,
        record: &[S],
    ) -> Result<Self, StatsError> {
        let [ts, up, down, ratio] = record else {
            return Err(StatsError::MalformedRecord(format!(
                "expected 4 fields, got {}",
                record.len()
            )));
        };
        let secs: i64 = parse_field("timestamp", ts.as_ref())?;
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            StatsError::MalformedRecord(format!("timestamp out of range: {secs}"))
        })?;

        let mut snapshot = Self::collected(
            tracker,
            parse_field("uploaded", up.as_ref())?,
            parse_field("downloaded", down.as_ref())?,
            parse_field("ratio", ratio.as_ref())?,
            timestamp,
        );
        snapshot.schema_version = 0;
        Ok(snapshot)
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, StatsError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| StatsError::MalformedRecord(format!("{name} '{raw}': {e}")))
}
