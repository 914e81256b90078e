//! Health monitor loop
//!
//! Startup runs one collection pass over every monitored tracker, the daily
//! roll-up and one dashboard refresh, then spawns the period timers and
//! serves their ticks until every timer is gone.
//!
//! Per tick, trackers of the fired period are processed one after another:
//! fetch counters, persist, load the previous sample, report progress,
//! evaluate the policy and trip the breaker on rejection. Per-tracker
//! failures never abort the tick. The dashboard is refreshed once per tick.

use crate::collaborators::{EntryKind, HistoryWindow, Severity};
use crate::context::MonitorContext;
use crate::error::{MonitorError, StoreError};
use crate::schedule::{spawn_timers, PeriodGroups, TickEvent};
use seedwatch_stats::{daily_rollup, describe, evaluate, RejectReason, Snapshot, Verdict};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TICK_QUEUE_CAPACITY: usize = 32;

/// Why a tracker was skipped for this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No stats section
    ConfigurationMissing,
    /// Counter fetch failed
    TrackerUnreachable,
    /// Store read or write failed
    Persistence,
}

/// Result of processing one tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOutcome {
    /// Trend acceptable
    Accepted,
    /// Trend unacceptable, breaker tripped
    Rejected(RejectReason),
    /// Not evaluated
    Skipped(SkipReason),
}

impl fmt::Display for TrackerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::Skipped(reason) => write!(f, "skipped: {reason:?}"),
        }
    }
}

/// Outcomes of one collection pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Period of the fired timer, `None` for the startup pass
    pub period_hours: Option<u32>,
    /// Outcome per tracker, in processing order
    pub outcomes: Vec<(String, TrackerOutcome)>,
}

impl TickReport {
    /// Outcome of one tracker
    #[must_use]
    pub fn outcome(&self, tracker: &str) -> Option<TrackerOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == tracker)
            .map(|(_, outcome)| *outcome)
    }

    /// Number of rejected trackers
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, TrackerOutcome::Rejected(_)))
    }

    /// Number of skipped trackers
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TrackerOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&TrackerOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Scheduler and circuit breaker loop
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    ctx: Arc<MonitorContext>,
    groups: PeriodGroups,
}

impl HealthMonitor {
    /// Create a monitor; trackers are grouped by period once, here
    #[must_use]
    pub fn new(ctx: MonitorContext) -> Self {
        let groups = PeriodGroups::from_settings(ctx.monitored());
        Self {
            ctx: Arc::new(ctx),
            groups,
        }
    }

    /// Shared context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &MonitorContext {
        &self.ctx
    }

    /// Period groups
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &PeriodGroups {
        &self.groups
    }

    /// Run the monitor on a background task
    #[must_use]
    pub fn spawn(self) -> JoinHandle<Result<(), MonitorError>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Initialize the store, run startup, then serve timer ticks
    ///
    /// Returns once every timer has stopped.
    ///
    /// # Errors
    /// Returns [`MonitorError::StoreInit`] if the store cannot be initialized;
    /// nothing else is fatal
    pub async fn run(&self) -> Result<(), MonitorError> {
        self.ctx.store().init().await.map_err(MonitorError::StoreInit)?;
        self.startup().await;

        let (tx, rx) = mpsc::channel(TICK_QUEUE_CAPACITY);
        let timers = spawn_timers(&self.groups, self.ctx.config().tick_unit(), &tx);
        drop(tx);
        self.drive(rx).await;

        for timer in timers {
            timer.abort();
        }
        Ok(())
    }

    /// Immediate pass over every tracker, roll-up and dashboard refresh
    pub async fn startup(&self) -> TickReport {
        tracing::info!(periods = self.groups.len(), "starting health monitor");
        let trackers: Vec<String> = self.groups.all_trackers().map(str::to_string).collect();
        let report = self.collect(None, &trackers).await;
        self.update_rollups().await;
        self.refresh_dashboard().await;
        report
    }

    /// Serve tick events until every sender is gone
    pub async fn drive(&self, mut rx: mpsc::Receiver<TickEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }
        tracing::warn!("all timers stopped, health monitor idle");
    }

    /// Handle one tick event
    ///
    /// Returns the report of a collection tick, `None` for a roll-up.
    pub async fn handle(&self, event: TickEvent) -> Option<TickReport> {
        match event {
            TickEvent::Collect { period_hours } => Some(self.tick(period_hours).await),
            TickEvent::DailyRollup => {
                self.update_rollups().await;
                None
            }
        }
    }

    /// Process every tracker of a period, then refresh the dashboard
    pub async fn tick(&self, period_hours: u32) -> TickReport {
        let trackers = self.groups.trackers(period_hours).to_vec();
        let report = self.collect(Some(period_hours), &trackers).await;
        self.refresh_dashboard().await;
        report
    }

    async fn collect(&self, period_hours: Option<u32>, trackers: &[String]) -> TickReport {
        let mut report = TickReport {
            period_hours,
            outcomes: Vec::with_capacity(trackers.len()),
        };
        for tracker in trackers {
            let outcome = self.process_tracker(tracker).await;
            report.outcomes.push((tracker.clone(), outcome));
        }
        tracing::info!(
            period_hours,
            trackers = report.outcomes.len(),
            rejected = report.rejected(),
            skipped = report.skipped(),
            "collection pass done"
        );
        report
    }

    /// Collect, persist and evaluate one tracker
    pub async fn process_tracker(&self, tracker: &str) -> TrackerOutcome {
        let Some(settings) = self.ctx.settings(tracker) else {
            tracing::debug!(tracker, "{}", MonitorError::ConfigurationMissing(tracker.to_string()));
            return TrackerOutcome::Skipped(SkipReason::ConfigurationMissing);
        };

        let counters = match self.ctx.client().fetch_counters(tracker).await {
            Ok(counters) => counters,
            Err(source) => {
                let err = MonitorError::TrackerUnreachable {
                    tracker: tracker.to_string(),
                    source,
                };
                tracing::error!(tracker, error = %err, "error getting stats");
                self.notify(&format!("Error getting stats: {err}"), tracker, Severity::Error)
                    .await;
                return TrackerOutcome::Skipped(SkipReason::TrackerUnreachable);
            }
        };

        let current = Snapshot::from_counters(tracker, counters, self.ctx.clock().now());
        let id = match self.ctx.store().save(current.clone()).await {
            Ok(id) => id,
            Err(source) => {
                self.persistence_failed(tracker, source);
                return TrackerOutcome::Skipped(SkipReason::Persistence);
            }
        };

        let previous = match self.previous_sample(tracker, id).await {
            Ok(previous) => previous,
            Err(source) => {
                self.persistence_failed(tracker, source);
                return TrackerOutcome::Skipped(SkipReason::Persistence);
            }
        };

        let progress = describe(&current, previous.as_ref(), &settings.targets);
        tracing::info!(tracker, "{progress}");
        self.notify(&progress, tracker, Severity::Info).await;

        match evaluate(&current, previous.as_ref(), &settings.thresholds, &settings.targets) {
            Verdict::Accept => TrackerOutcome::Accepted,
            Verdict::Reject(reason) => {
                let newly = self.ctx.breaker().trip(tracker);
                tracing::warn!(tracker, %reason, newly, "autosnatch disabled");
                self.notify(&alert_message(tracker, reason), tracker, Severity::Error)
                    .await;
                TrackerOutcome::Rejected(reason)
            }
        }
    }

    /// Persist missing start-of-day entries, returning how many were added
    pub async fn update_rollups(&self) -> usize {
        let today = self.ctx.clock().now();
        let mut added = 0;
        for (tracker, _) in self.ctx.monitored() {
            match self.rollup_tracker(tracker, today).await {
                Ok(count) => added += count,
                Err(source) => self.persistence_failed(tracker, source),
            }
        }
        if added > 0 {
            tracing::info!(added, "daily stats updated");
        }
        added
    }

    async fn rollup_tracker(
        &self,
        tracker: &str,
        today: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize, StoreError> {
        let store = self.ctx.store();
        let collected = store.entries(tracker, EntryKind::Collected).await?;
        let existing: BTreeSet<_> = store
            .entries(tracker, EntryKind::StartOfDay)
            .await?
            .into_iter()
            .map(|s| s.timestamp)
            .collect();

        let days = daily_rollup(&collected, &existing, today);
        let count = days.len();
        for day in days {
            store.save(day).await?;
        }
        Ok(count)
    }

    /// Rebuild then deploy the dashboard from recent history
    pub async fn refresh_dashboard(&self) {
        let depth = self.ctx.config().history_depth;
        let mut history = BTreeMap::new();
        for (tracker, _) in self.ctx.monitored() {
            // one extra snapshot tells whether the window reaches the first sample
            match self.ctx.store().most_recent(tracker, depth.saturating_add(1)).await {
                Ok(recent) => {
                    history.insert(tracker.to_string(), HistoryWindow::from_recent(recent, depth));
                }
                Err(StoreError::NotFound(_)) => {}
                Err(e) => tracing::warn!(tracker, error = %e, "cannot load dashboard history"),
            }
        }

        let dashboard = self.ctx.dashboard();
        if let Err(e) = dashboard.rebuild(&history).await {
            tracing::error!(error = %e, "error generating dashboard");
            return;
        }
        if let Err(e) = dashboard.deploy().await {
            tracing::error!(error = %e, "error deploying dashboard");
        }
    }

    async fn previous_sample(
        &self,
        tracker: &str,
        saved: u64,
    ) -> Result<Option<Snapshot>, StoreError> {
        match self.ctx.store().most_recent(tracker, 2).await {
            Ok(recent) => Ok(recent.into_iter().find(|s| s.id != saved)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn persistence_failed(&self, tracker: &str, source: StoreError) {
        let err = MonitorError::Persistence {
            tracker: tracker.to_string(),
            source,
        };
        tracing::error!(tracker, error = %err, "skipping tracker");
    }

    async fn notify(&self, message: &str, tracker: &str, severity: Severity) {
        if let Err(e) = self.ctx.notifier().notify(message, tracker, severity).await {
            tracing::warn!(tracker, %severity, error = %e, "notification failed");
        }
    }
}

fn alert_message(tracker: &str, reason: RejectReason) -> String {
    match reason {
        RejectReason::RatioBelowMinimum => {
            format!("Ratio dropped below minimum authorized for {tracker}, autosnatch disabled")
        }
        RejectReason::BufferDropExceeded => {
            format!("Buffer dropped too much for {tracker}, autosnatch disabled")
        }
    }
}
