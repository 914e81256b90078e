//! Collaborator interfaces
//!
//! The monitor only talks to the outside world through these traits. The
//! history store reports typed [`StoreError`]s because the engine reacts to
//! `NotFound`; the other collaborators fail opaquely with `anyhow`.

use crate::error::StoreError;
use async_trait::async_trait;
use seedwatch_stats::{Counters, Snapshot};
use std::collections::BTreeMap;
use std::fmt;

/// Selection of stored entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Real samples
    Collected,
    /// Start-of-day markers
    StartOfDay,
    /// Start-of-week markers
    StartOfWeek,
    /// Start-of-month markers
    StartOfMonth,
}

impl EntryKind {
    /// Check if a snapshot belongs to this kind
    #[must_use]
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        match self {
            Self::Collected => snapshot.collected,
            Self::StartOfDay => snapshot.start_of_day,
            Self::StartOfWeek => snapshot.start_of_week,
            Self::StartOfMonth => snapshot.start_of_month,
        }
    }
}

/// Durable per-tracker snapshot log
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Prepare the backend; failure here is fatal to the monitor
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Append a snapshot, returning its sequence id
    async fn save(&self, snapshot: Snapshot) -> Result<u64, StoreError>;

    /// Up to `count` collected snapshots, newest first
    ///
    /// Returns [`StoreError::NotFound`] when the tracker has none.
    async fn most_recent(&self, tracker: &str, count: usize) -> Result<Vec<Snapshot>, StoreError>;

    /// All snapshots of one kind, oldest first (possibly empty)
    async fn entries(&self, tracker: &str, kind: EntryKind) -> Result<Vec<Snapshot>, StoreError>;
}

/// Remote tracker account
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Current cumulative counters
    async fn fetch_counters(&self, tracker: &str) -> anyhow::Result<Counters>;
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Progress report
    Info,
    /// Failure or alert
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Outbound notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message about a tracker
    async fn notify(&self, message: &str, tracker: &str, severity: Severity) -> anyhow::Result<()>;
}

/// Recent snapshots of one tracker, as handed to the dashboard
///
/// A window cut at the history depth carries one extra, older snapshot that
/// only serves as the predecessor of its oldest row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryWindow {
    /// Snapshots, newest first
    pub newest_first: Vec<Snapshot>,
    /// Whether the oldest snapshot is the tracker's first sample
    pub complete: bool,
}

impl HistoryWindow {
    /// Wrap the result of a `most_recent(tracker, depth + 1)` read
    #[must_use]
    pub fn from_recent(newest_first: Vec<Snapshot>, depth: usize) -> Self {
        let complete = newest_first.len() <= depth;
        Self {
            newest_first,
            complete,
        }
    }

    /// (current, previous) pairs to render, newest first
    ///
    /// `previous` is `None` only for the tracker's first sample.
    pub fn rows(&self) -> impl Iterator<Item = (&Snapshot, Option<&Snapshot>)> {
        let snapshots = &self.newest_first;
        let complete = self.complete;
        snapshots
            .iter()
            .enumerate()
            .map(|(i, current)| (current, snapshots.get(i + 1)))
            .filter(move |(_, previous)| complete || previous.is_some())
    }
}

/// Dashboard generator
#[async_trait]
pub trait DashboardBuilder: Send + Sync {
    /// Regenerate from per-tracker history windows
    async fn rebuild(&self, history: &BTreeMap<String, HistoryWindow>) -> anyhow::Result<()>;

    /// Publish the last rebuild
    async fn deploy(&self) -> anyhow::Result<()>;
}
