//! Seedwatch Core - tracker health monitor
//!
//! Periodically samples every configured tracker account, persists the
//! sample, compares it with the previous one and disables automatic
//! acquisition (trips the circuit breaker) when the trend is unacceptable.
//!
//! # Architecture
//!
//! ```text
//! period timers ──► fan-in queue ──► HealthMonitor
//!                                       │ per tracker
//!                                       ├─► TrackerClient::fetch_counters
//!                                       ├─► HistoryStore::save / most_recent
//!                                       ├─► describe + evaluate (seedwatch-stats)
//!                                       ├─► CircuitBreaker::trip + Notifier
//!                                       └─► DashboardBuilder (once per tick)
//! ```
//!
//! Collaborators are traits; [`MemoryHistoryStore`], [`LogNotifier`] and
//! [`TextDashboard`] are the bundled implementations.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod breaker;
mod clock;
mod collaborators;
mod config;
mod context;
mod dashboard;
mod error;
mod monitor;
mod notify;
mod schedule;
mod store;

// Re-exports
pub use breaker::CircuitBreaker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    DashboardBuilder, EntryKind, HistoryStore, HistoryWindow, Notifier, Severity, TrackerClient,
};
pub use config::{
    MonitorConfig, StatsConfig, TrackerConfig, TrackerSettings, DEFAULT_HISTORY_DEPTH,
    DEFAULT_TICK_UNIT_SECS, MAX_TICK_UNIT_SECS,
};
pub use context::MonitorContext;
pub use dashboard::TextDashboard;
pub use error::{ConfigError, MonitorError, StoreError};
pub use monitor::{HealthMonitor, SkipReason, TickReport, TrackerOutcome};
pub use notify::LogNotifier;
pub use schedule::{spawn_timers, PeriodGroups, TickEvent, ROLLUP_PERIOD_UNITS};
pub use store::{migrate, MemoryHistoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
