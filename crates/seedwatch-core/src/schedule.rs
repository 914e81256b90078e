//! Period timers and fan-in queue
//!
//! Trackers are grouped by polling period. Each distinct period gets its own
//! timer task pushing tagged [`TickEvent`]s onto one shared channel; the
//! monitor loop consumes that channel. A timer whose receiver is gone stops,
//! the others keep running.

use crate::config::TrackerSettings;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Period units between two daily roll-ups
pub const ROLLUP_PERIOD_UNITS: u32 = 24;

/// Trackers grouped by polling period (in period units)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodGroups {
    groups: BTreeMap<u32, Vec<String>>,
}

impl PeriodGroups {
    /// Group trackers by their configured period
    pub fn from_settings<'a, I>(settings: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a TrackerSettings)>,
    {
        let mut groups: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (name, s) in settings {
            groups.entry(s.period_hours).or_default().push(name.to_string());
        }
        Self { groups }
    }

    /// Distinct periods, ascending
    pub fn periods(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.keys().copied()
    }

    /// Trackers bound to a period
    #[must_use]
    pub fn trackers(&self, period_hours: u32) -> &[String] {
        self.groups.get(&period_hours).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every grouped tracker, by period then configuration order
    pub fn all_trackers(&self) -> impl Iterator<Item = &str> {
        self.groups.values().flatten().map(String::as_str)
    }

    /// Number of distinct periods
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no tracker is monitored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// (period, trackers) pairs, ascending period
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[String])> {
        self.groups.iter().map(|(p, t)| (*p, t.as_slice()))
    }
}

/// One timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickEvent {
    /// Collect every tracker of this period
    Collect {
        /// Period of the fired timer
        period_hours: u32,
    },
    /// Compute missing start-of-day entries
    DailyRollup,
}

/// Spawn one timer per period, plus the daily roll-up timer
///
/// Timers first fire one full period after spawning. Dropping the receiver
/// stops them at their next firing; the handles may also be aborted.
pub fn spawn_timers(
    groups: &PeriodGroups,
    unit: Duration,
    tx: &mpsc::Sender<TickEvent>,
) -> Vec<JoinHandle<()>> {
    let mut handles: Vec<_> = groups
        .periods()
        .map(|period_hours| {
            let every = unit.saturating_mul(period_hours);
            tracing::info!(
                period_hours,
                trackers = groups.trackers(period_hours).len(),
                "starting period timer"
            );
            tokio::spawn(run_timer(TickEvent::Collect { period_hours }, every, tx.clone()))
        })
        .collect();

    if !groups.is_empty() {
        let every = unit.saturating_mul(ROLLUP_PERIOD_UNITS);
        handles.push(tokio::spawn(run_timer(TickEvent::DailyRollup, every, tx.clone())));
    }
    handles
}

async fn run_timer(event: TickEvent, every: Duration, tx: mpsc::Sender<TickEvent>) {
    // the interval re-arms at `deadline + every`, so two periods must fit
    let now = Instant::now();
    let Some(start) = now
        .checked_add(every)
        .filter(|start| start.checked_add(every).is_some())
    else {
        tracing::warn!(?event, ?every, "timer period out of range, timer not started");
        return;
    };
    let mut ticker = interval_at(start, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if tx.send(event).await.is_err() {
            tracing::debug!(?event, "tick receiver closed, stopping timer");
            break;
        }
    }
}
