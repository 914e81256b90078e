//! Error types for Seedwatch Core
//!
//! Per-tracker failures ([`MonitorError::TrackerUnreachable`],
//! [`MonitorError::Persistence`]) are caught and logged by the monitor loop;
//! only [`MonitorError::StoreInit`] stops it from starting.

use seedwatch_stats::StatsError;
use std::path::PathBuf;

/// Main monitor error type
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Tracker has no stats section; it is skipped, not failed
    #[error("no stats configuration for tracker {0}")]
    ConfigurationMissing(String),

    /// Counter fetch failed
    #[error("tracker {tracker} unreachable: {source}")]
    TrackerUnreachable {
        /// Tracker label
        tracker: String,
        /// Client failure
        #[source]
        source: anyhow::Error,
    },

    /// History store read or write failed
    #[error("persistence failed for tracker {tracker}: {source}")]
    Persistence {
        /// Tracker label
        tracker: String,
        /// Store failure
        #[source]
        source: StoreError,
    },

    /// History store could not be initialized
    #[error("history store initialization failed: {0}")]
    StoreInit(#[source] StoreError),

    /// Arithmetic precondition violated
    #[error("stats error: {0}")]
    Stats(#[from] StatsError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MonitorError {
    /// Check if the error only affects one tracker
    #[inline]
    #[must_use]
    pub fn is_per_tracker(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing(_) | Self::TrackerUnreachable { .. } | Self::Persistence { .. }
        )
    }
}

/// History store errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No entries for this tracker
    #[error("no stats entries for tracker {0}")]
    NotFound(String),

    /// Record written by a newer schema
    #[error("unsupported schema version {found} (current: {current})")]
    UnsupportedSchema {
        /// Version carried by the record
        found: u32,
        /// Version this build understands
        current: u32,
    },

    /// Storage backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// IO failure
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or shape error
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Semantically invalid tracker section
    #[error("invalid configuration for tracker '{tracker}': {reason}")]
    Invalid {
        /// Tracker label (may be empty)
        tracker: String,
        /// What is wrong
        reason: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::Invalid`]
    #[inline]
    #[must_use]
    pub fn invalid(tracker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            tracker: tracker.into(),
            reason: reason.into(),
        }
    }
}
