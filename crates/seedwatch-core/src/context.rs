//! Monitor context
//!
//! Everything the monitor loop needs, built once at startup and passed
//! explicitly: validated configuration, resolved per-tracker settings,
//! collaborators, the shared circuit breaker and the clock.

use crate::breaker::CircuitBreaker;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{DashboardBuilder, HistoryStore, Notifier, TrackerClient};
use crate::config::{MonitorConfig, TrackerSettings};
use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared monitor environment
#[derive(Clone)]
pub struct MonitorContext {
    config: MonitorConfig,
    settings: BTreeMap<String, TrackerSettings>,
    store: Arc<dyn HistoryStore>,
    client: Arc<dyn TrackerClient>,
    notifier: Arc<dyn Notifier>,
    dashboard: Arc<dyn DashboardBuilder>,
    breaker: CircuitBreaker,
    clock: Arc<dyn Clock>,
}

impl MonitorContext {
    /// Build a context, resolving every tracker's stats section
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if a stats section is invalid
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn HistoryStore>,
        client: Arc<dyn TrackerClient>,
        notifier: Arc<dyn Notifier>,
        dashboard: Arc<dyn DashboardBuilder>,
    ) -> Result<Self, ConfigError> {
        let settings = config
            .monitored()
            .map(|(name, stats)| stats.settings(name).map(|s| (name.to_string(), s)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        let breaker = CircuitBreaker::from_config(&config);

        Ok(Self {
            config,
            settings,
            store,
            client,
            notifier,
            dashboard,
            breaker,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use a different clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing breaker
    #[inline]
    #[must_use]
    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    /// Validated configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Settings of a monitored tracker, `None` if it has no stats section
    #[inline]
    #[must_use]
    pub fn settings(&self, tracker: &str) -> Option<&TrackerSettings> {
        self.settings.get(tracker)
    }

    /// Monitored trackers, sorted by name
    pub fn monitored(&self) -> impl Iterator<Item = (&str, &TrackerSettings)> {
        self.settings.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// History store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &dyn HistoryStore {
        self.store.as_ref()
    }

    /// Tracker client
    #[inline]
    #[must_use]
    pub fn client(&self) -> &dyn TrackerClient {
        self.client.as_ref()
    }

    /// Notification sink
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Dashboard builder
    #[inline]
    #[must_use]
    pub fn dashboard(&self) -> &dyn DashboardBuilder {
        self.dashboard.as_ref()
    }

    /// Shared circuit breaker
    #[inline]
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Clock
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl fmt::Debug for MonitorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorContext")
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("breaker", &self.breaker)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
