//! In-memory history store
//!
//! Keeps every tracker's snapshots in timestamp order. All writes go through
//! [`migrate`], the single place where persisted schema versions are
//! upgraded.

use crate::collaborators::{EntryKind, HistoryStore};
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use seedwatch_stats::{Snapshot, SCHEMA_VERSION};
use std::sync::atomic::{AtomicU64, Ordering};

/// Upgrade a snapshot to the current schema
///
/// Version 0 records come from the legacy row format, which only ever held
/// real samples.
///
/// # Errors
/// Returns [`StoreError::UnsupportedSchema`] for versions newer than this build
pub fn migrate(mut snapshot: Snapshot) -> Result<Snapshot, StoreError> {
    match snapshot.schema_version {
        0 => {
            snapshot.collected = true;
            snapshot.schema_version = SCHEMA_VERSION;
            Ok(snapshot)
        }
        SCHEMA_VERSION => Ok(snapshot),
        found => Err(StoreError::UnsupportedSchema {
            found,
            current: SCHEMA_VERSION,
        }),
    }
}

/// History store held in process memory
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: DashMap<String, Vec<Snapshot>>,
    sequence: AtomicU64,
}

impl MemoryHistoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Import legacy `[unix_ts, up, down, ratio]` rows for one tracker
    ///
    /// Malformed rows are logged and skipped. Returns the number imported.
    ///
    /// # Errors
    /// Returns the first [`StoreError`] raised while saving
    pub async fn import_legacy<S: AsRef<str>>(
        &self,
        tracker: &str,
        rows: &[Vec<S>],
    ) -> Result<usize, StoreError> {
        let mut imported = 0;
        for (line, row) in rows.iter().enumerate() {
            match Snapshot::from_record(tracker, row) {
                Ok(snapshot) => {
                    self.save(snapshot).await?;
                    imported += 1;
                }
                Err(e) => tracing::warn!(tracker, line, error = %e, "skipping legacy row"),
            }
        }
        tracing::info!(tracker, imported, "legacy history imported");
        Ok(imported)
    }

    /// Total number of stored snapshots
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn save(&self, snapshot: Snapshot) -> Result<u64, StoreError> {
        let mut snapshot = migrate(snapshot)?;
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        snapshot.id = id;

        let mut log = self.entries.entry(snapshot.tracker.clone()).or_default();
        // keep timestamp order; equal timestamps stay in insertion order
        let at = log.partition_point(|s| s.timestamp <= snapshot.timestamp);
        log.insert(at, snapshot);
        Ok(id)
    }

    async fn most_recent(&self, tracker: &str, count: usize) -> Result<Vec<Snapshot>, StoreError> {
        let log = self
            .entries
            .get(tracker)
            .ok_or_else(|| StoreError::NotFound(tracker.to_string()))?;
        let recent: Vec<_> = log
            .iter()
            .rev()
            .filter(|s| s.collected)
            .take(count)
            .cloned()
            .collect();
        if recent.is_empty() {
            return Err(StoreError::NotFound(tracker.to_string()));
        }
        Ok(recent)
    }

    async fn entries(&self, tracker: &str, kind: EntryKind) -> Result<Vec<Snapshot>, StoreError> {
        Ok(self
            .entries
            .get(tracker)
            .map(|log| log.iter().filter(|s| kind.matches(s)).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn sample(up: u64, hours: i64) -> Snapshot {
        Snapshot::collected("blue", up, 10, 1.0, at(hours))
    }

    #[tokio::test]
    async fn ids_increase_and_recent_is_newest_first() {
        let store = MemoryHistoryStore::new();
        let a = store.save(sample(1, 0)).await.unwrap();
        let b = store.save(sample(2, 1)).await.unwrap();
        assert!(b > a);

        let recent = store.most_recent("blue", 5).await.unwrap();
        let ups: Vec<_> = recent.iter().map(|s| s.uploaded).collect();
        assert_eq!(ups, vec![2, 1]);
        assert_eq!(recent[0].id, b);
    }

    #[tokio::test]
    async fn out_of_order_saves_are_sorted() {
        let store = MemoryHistoryStore::new();
        store.save(sample(3, 3)).await.unwrap();
        store.save(sample(1, 1)).await.unwrap();
        store.save(sample(2, 2)).await.unwrap();

        let all = store.entries("blue", EntryKind::Collected).await.unwrap();
        let ups: Vec<_> = all.iter().map(|s| s.uploaded).collect();
        assert_eq!(ups, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn unknown_tracker_is_not_found() {
        let store = MemoryHistoryStore::new();
        assert_eq!(
            store.most_recent("blue", 1).await.unwrap_err(),
            StoreError::NotFound("blue".into())
        );
        assert!(store.entries("blue", EntryKind::StartOfDay).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn synthetic_entries_are_not_recent() {
        let store = MemoryHistoryStore::new();
        let mut marker = sample(5, 0);
        marker.collected = false;
        marker.start_of_day = true;
        store.save(marker).await.unwrap();

        assert!(store.most_recent("blue", 1).await.is_err());
        assert_eq!(store.entries("blue", EntryKind::StartOfDay).await.unwrap().len(), 1);
    }

    #[test]
    fn migration_rules() {
        let mut legacy = sample(1, 0);
        legacy.schema_version = 0;
        legacy.collected = false;
        let upgraded = migrate(legacy).unwrap();
        assert_eq!(upgraded.schema_version, SCHEMA_VERSION);
        assert!(upgraded.collected);

        let mut future = sample(1, 0);
        future.schema_version = SCHEMA_VERSION + 1;
        assert_eq!(
            migrate(future).unwrap_err(),
            StoreError::UnsupportedSchema {
                found: SCHEMA_VERSION + 1,
                current: SCHEMA_VERSION,
            }
        );
    }

    #[tokio::test]
    async fn legacy_import_skips_bad_rows() {
        let store = MemoryHistoryStore::new();
        let rows = vec![
            vec!["1711929600", "100", "50", "2.0"],
            vec!["garbage"],
            vec!["1711933200", "120", "50", "2.4"],
        ];
        assert_eq!(store.import_legacy("blue", &rows).await.unwrap(), 2);
        assert_eq!(store.len(), 2);

        let recent = store.most_recent("blue", 1).await.unwrap();
        assert_eq!(recent[0].uploaded, 120);
        assert_eq!(recent[0].schema_version, SCHEMA_VERSION);
    }
}
