//! Testing utilities for Seedwatch workspace
//!
//! Fixtures plus scripted fakes for every monitor collaborator.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use seedwatch_core::{
    DashboardBuilder, EntryKind, HealthMonitor, HistoryStore, HistoryWindow, ManualClock,
    MemoryHistoryStore, MonitorConfig, MonitorContext, Notifier, Severity, StatsConfig, StoreError,
    TrackerClient, TrackerConfig,
};
use seedwatch_stats::{Counters, Snapshot, MIB};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn mib(n: u64) -> u64 {
    n * MIB
}

/// 2024-07-01 00:00 UTC (a Monday) plus `hours`
pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
}

pub fn counters(up_mib: u64, down_mib: u64, ratio: f64) -> Counters {
    Counters::new(mib(up_mib), mib(down_mib), ratio)
}

pub fn snapshot(tracker: &str, up_mib: u64, down_mib: u64, ratio: f64, hours: i64) -> Snapshot {
    Snapshot::collected(tracker, mib(up_mib), mib(down_mib), ratio, at(hours))
}

/// Config with one monitored section per `(name, period, max_decrease_mb, min_ratio)`
pub fn config(trackers: &[(&str, u32, u64, f64)]) -> MonitorConfig {
    let mut config = MonitorConfig {
        tick_unit_secs: 60,
        trackers: trackers
            .iter()
            .map(|(name, period, max_mb, min_ratio)| {
                TrackerConfig::monitored(
                    *name,
                    StatsConfig::new(*period, *max_mb).with_minimum_ratio(*min_ratio),
                )
            })
            .collect(),
        ..MonitorConfig::default()
    };
    config.check().unwrap();
    config
}

/// Tracker client replaying queued results; an empty queue is a failure
#[derive(Debug, Default)]
pub struct ScriptedTrackerClient {
    script: Mutex<HashMap<String, VecDeque<Result<Counters, String>>>>,
    calls: AtomicUsize,
}

impl ScriptedTrackerClient {
    pub fn push(&self, tracker: &str, counters: Counters) {
        self.script
            .lock()
            .entry(tracker.to_string())
            .or_default()
            .push_back(Ok(counters));
    }

    pub fn push_failure(&self, tracker: &str, message: &str) {
        self.script
            .lock()
            .entry(tracker.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackerClient for ScriptedTrackerClient {
    async fn fetch_counters(&self, tracker: &str) -> anyhow::Result<Counters> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .get_mut(tracker)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(counters)) => Ok(counters),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted counters for {tracker}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub tracker: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Make every later notify call fail (after recording it)
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn errors_for(&self, tracker: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.tracker == tracker && n.severity == Severity::Error)
            .map(|n| n.message.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str, tracker: &str, severity: Severity) -> anyhow::Result<()> {
        self.sent.lock().push(Notification {
            message: message.to_string(),
            tracker: tracker.to_string(),
            severity,
        });
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("notification sink down");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingDashboard {
    rebuilds: AtomicUsize,
    deploys: AtomicUsize,
    last: Mutex<BTreeMap<String, HistoryWindow>>,
    failing: AtomicBool,
}

impl RecordingDashboard {
    /// Make every later rebuild fail
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }

    pub fn deploys(&self) -> usize {
        self.deploys.load(Ordering::SeqCst)
    }

    pub fn last_history(&self) -> BTreeMap<String, HistoryWindow> {
        self.last.lock().clone()
    }
}

#[async_trait]
impl DashboardBuilder for RecordingDashboard {
    async fn rebuild(&self, history: &BTreeMap<String, HistoryWindow>) -> anyhow::Result<()> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("template error");
        }
        *self.last.lock() = history.clone();
        Ok(())
    }

    async fn deploy(&self) -> anyhow::Result<()> {
        self.deploys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Memory store with injectable failures
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryHistoryStore,
    fail_init: AtomicBool,
    fail_reads: AtomicBool,
    fail_saves: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn fail_init(&self) {
        self.fail_init.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_saves_for(&self, tracker: &str) {
        self.fail_saves.lock().insert(tracker.to_string());
    }

    pub fn inner(&self) -> &MemoryHistoryStore {
        &self.inner
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read failed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FlakyStore {
    async fn init(&self) -> Result<(), StoreError> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("database locked".into()));
        }
        Ok(())
    }

    async fn save(&self, snapshot: Snapshot) -> Result<u64, StoreError> {
        if self.fail_saves.lock().contains(&snapshot.tracker) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.save(snapshot).await
    }

    async fn most_recent(&self, tracker: &str, count: usize) -> Result<Vec<Snapshot>, StoreError> {
        self.check_reads()?;
        self.inner.most_recent(tracker, count).await
    }

    async fn entries(&self, tracker: &str, kind: EntryKind) -> Result<Vec<Snapshot>, StoreError> {
        self.check_reads()?;
        self.inner.entries(tracker, kind).await
    }
}

/// Fakes wired into a monitor
#[derive(Debug, Clone)]
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub client: Arc<ScriptedTrackerClient>,
    pub notifier: Arc<RecordingNotifier>,
    pub dashboard: Arc<RecordingDashboard>,
    pub clock: Arc<ManualClock>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(FlakyStore::default()),
            client: Arc::new(ScriptedTrackerClient::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            dashboard: Arc::new(RecordingDashboard::default()),
            clock: Arc::new(ManualClock::new(at(0))),
        }
    }

    pub fn context(&self, config: MonitorConfig) -> MonitorContext {
        MonitorContext::new(
            config,
            self.store.clone(),
            self.client.clone(),
            self.notifier.clone(),
            self.dashboard.clone(),
        )
        .unwrap()
        .with_clock(self.clock.clone())
    }

    pub fn monitor(&self, config: MonitorConfig) -> HealthMonitor {
        HealthMonitor::new(self.context(config))
    }
}
