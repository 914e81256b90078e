//! Autosnatch circuit breaker
//!
//! One "autosnatch disabled" flag per tracker behind a single reader/writer
//! lock. Clones share the same flags, so other subsystems can read while the
//! monitor loop trips. Flags are only cleared through [`CircuitBreaker::reset_all`].

use crate::config::MonitorConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared per-tracker breaker flags
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    /// tracker -> autosnatch disabled
    flags: Arc<RwLock<HashMap<String, bool>>>,
}

impl CircuitBreaker {
    /// Create an empty breaker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Breaker with every configured tracker closed
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        let flags = config
            .trackers
            .iter()
            .map(|t| (t.name.clone(), false))
            .collect();
        Self {
            flags: Arc::new(RwLock::new(flags)),
        }
    }

    /// Disable autosnatch for a tracker
    ///
    /// Returns `true` if the flag was not already set.
    pub fn trip(&self, tracker: &str) -> bool {
        let previous = self.flags.write().insert(tracker.to_string(), true);
        previous != Some(true)
    }

    /// Check if a tracker's breaker is open
    #[must_use]
    pub fn is_tripped(&self, tracker: &str) -> bool {
        self.flags.read().get(tracker).copied().unwrap_or(false)
    }

    /// Check if automatic acquisition may run for a tracker
    #[inline]
    #[must_use]
    pub fn autosnatch_enabled(&self, config: &MonitorConfig, tracker: &str) -> bool {
        config.tracker(tracker).is_some_and(|t| t.autosnatch) && !self.is_tripped(tracker)
    }

    /// Tripped trackers, sorted
    #[must_use]
    pub fn tripped(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .flags
            .read()
            .iter()
            .filter(|(_, disabled)| **disabled)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Close every breaker, returning how many were open
    pub fn reset_all(&self) -> usize {
        let mut flags = self.flags.write();
        let mut reset = 0;
        for disabled in flags.values_mut() {
            if *disabled {
                *disabled = false;
                reset += 1;
            }
        }
        if reset > 0 {
            tracing::info!(reset, "circuit breakers reset");
        }
        reset
    }
}
