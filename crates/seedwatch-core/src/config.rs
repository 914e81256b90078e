//! Monitor configuration
//!
//! Loaded from YAML. [`MonitorConfig::check`] fills defaults and validates
//! every tracker section; a tracker without a `stats` section stays in the
//! configuration but is never monitored.

use crate::error::ConfigError;
use seedwatch_stats::{PolicyThresholds, RatioTargets, DEFAULT_TARGET_RATIO, WARNING_RATIO};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of snapshots per tracker handed to the dashboard
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Default length of one period unit (one hour)
pub const DEFAULT_TICK_UNIT_SECS: u64 = 3600;

/// Longest accepted period unit (one day)
pub const MAX_TICK_UNIT_SECS: u64 = 86_400;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Snapshots per tracker handed to the dashboard
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
    /// Seconds in one period unit
    #[serde(default = "default_tick_unit_secs")]
    pub tick_unit_secs: u64,
    /// Where the text dashboard is deployed
    #[serde(default)]
    pub dashboard_output: Option<PathBuf>,
    /// Tracker sections
    #[serde(default)]
    pub trackers: Vec<TrackerConfig>,
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

fn default_tick_unit_secs() -> u64 {
    DEFAULT_TICK_UNIT_SECS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            tick_unit_secs: DEFAULT_TICK_UNIT_SECS,
            dashboard_output: None,
            trackers: Vec::new(),
        }
    }
}

/// One tracker section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Tracker label
    pub name: String,
    /// Automatic acquisition enabled at startup
    #[serde(default)]
    pub autosnatch: bool,
    /// Health monitoring settings
    #[serde(default)]
    pub stats: Option<StatsConfig>,
}

impl TrackerConfig {
    /// Tracker section with stats
    #[must_use]
    pub fn monitored(name: impl Into<String>, stats: StatsConfig) -> Self {
        Self {
            name: name.into(),
            autosnatch: true,
            stats: Some(stats),
        }
    }

    /// Tracker section without stats
    #[must_use]
    pub fn unmonitored(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            autosnatch: false,
            stats: None,
        }
    }
}

/// Health monitoring settings of one tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Polling period, in period units
    #[serde(rename = "update_period_hour")]
    pub update_period_hours: u32,
    /// Largest tolerated buffer drop per period, in MiB (0 = unbounded)
    #[serde(rename = "max_buffer_decrease_by_period_mb", default)]
    pub max_buffer_decrease_mb: u64,
    /// Ratio at or below which autosnatch is disabled
    #[serde(rename = "min_ratio", default)]
    pub minimum_ratio: f64,
    /// Ratio used to derive the buffer
    #[serde(default)]
    pub target_ratio: f64,
}

impl StatsConfig {
    /// Settings with defaults left to [`StatsConfig::check`]
    #[inline]
    #[must_use]
    pub fn new(update_period_hours: u32, max_buffer_decrease_mb: u64) -> Self {
        Self {
            update_period_hours,
            max_buffer_decrease_mb,
            minimum_ratio: 0.0,
            target_ratio: 0.0,
        }
    }

    /// Set minimum ratio
    #[inline]
    #[must_use]
    pub fn with_minimum_ratio(mut self, ratio: f64) -> Self {
        self.minimum_ratio = ratio;
        self
    }

    /// Set target ratio
    #[inline]
    #[must_use]
    pub fn with_target_ratio(mut self, ratio: f64) -> Self {
        self.target_ratio = ratio;
        self
    }

    /// Fill defaults and validate
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] on a zero period or inconsistent ratios
    pub fn check(&mut self, tracker: &str) -> Result<(), ConfigError> {
        if self.update_period_hours == 0 {
            return Err(ConfigError::invalid(tracker, "update_period_hour must be > 0"));
        }
        if self.minimum_ratio == 0.0 {
            self.minimum_ratio = WARNING_RATIO;
        }
        if self.minimum_ratio < WARNING_RATIO {
            return Err(ConfigError::invalid(
                tracker,
                format!("min_ratio must be >= {WARNING_RATIO}"),
            ));
        }
        if self.target_ratio == 0.0 {
            self.target_ratio = DEFAULT_TARGET_RATIO;
        }
        if self.target_ratio <= WARNING_RATIO {
            return Err(ConfigError::invalid(
                tracker,
                format!("target_ratio must be > {WARNING_RATIO}"),
            ));
        }
        if self.target_ratio < self.minimum_ratio {
            return Err(ConfigError::invalid(tracker, "target_ratio must be >= min_ratio"));
        }
        Ok(())
    }

    /// Resolve into engine settings
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the section does not pass [`StatsConfig::check`]
    pub fn settings(&self, tracker: &str) -> Result<TrackerSettings, ConfigError> {
        let mut checked = *self;
        checked.check(tracker)?;
        let targets = RatioTargets::with_target(checked.target_ratio)
            .map_err(|e| ConfigError::invalid(tracker, e.to_string()))?;
        Ok(TrackerSettings {
            period_hours: checked.update_period_hours,
            thresholds: PolicyThresholds::new(checked.minimum_ratio, checked.max_buffer_decrease_mb),
            targets,
        })
    }
}

/// Validated per-tracker settings used by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Polling period, in period units
    pub period_hours: u32,
    /// Policy thresholds
    pub thresholds: PolicyThresholds,
    /// Buffer derivation ratios
    pub targets: RatioTargets,
}

impl MonitorConfig {
    /// Parse and validate a YAML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`]
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any
    /// [`MonitorConfig::from_yaml_str`] error
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), trackers = config.trackers.len(), "configuration loaded");
        Ok(config)
    }

    /// Fill defaults and validate every section
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] on empty or duplicate names, a tick
    /// unit outside `1..=MAX_TICK_UNIT_SECS`, a zero history depth, or an
    /// invalid stats section
    pub fn check(&mut self) -> Result<(), ConfigError> {
        if self.tick_unit_secs == 0 {
            return Err(ConfigError::invalid("", "tick_unit_secs must be > 0"));
        }
        if self.tick_unit_secs > MAX_TICK_UNIT_SECS {
            return Err(ConfigError::invalid(
                "",
                format!("tick_unit_secs must be <= {MAX_TICK_UNIT_SECS}"),
            ));
        }
        if self.history_depth == 0 {
            return Err(ConfigError::invalid("", "history_depth must be > 0"));
        }
        let mut seen = HashSet::new();
        for tracker in &mut self.trackers {
            if tracker.name.trim().is_empty() {
                return Err(ConfigError::invalid("", "tracker name must not be empty"));
            }
            if !seen.insert(tracker.name.clone()) {
                return Err(ConfigError::invalid(&tracker.name, "duplicate tracker name"));
            }
            if let Some(stats) = tracker.stats.as_mut() {
                stats.check(&tracker.name)?;
            }
        }
        Ok(())
    }

    /// Length of one period unit
    #[inline]
    #[must_use]
    pub fn tick_unit(&self) -> Duration {
        Duration::from_secs(self.tick_unit_secs)
    }

    /// Tracker section by name
    #[must_use]
    pub fn tracker(&self, name: &str) -> Option<&TrackerConfig> {
        self.trackers.iter().find(|t| t.name == name)
    }

    /// Trackers with a stats section, in configuration order
    pub fn monitored(&self) -> impl Iterator<Item = (&str, &StatsConfig)> {
        self.trackers
            .iter()
            .filter_map(|t| t.stats.as_ref().map(|s| (t.name.as_str(), s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
history_depth: 20
tick_unit_secs: 60
trackers:
  - name: blue
    autosnatch: true
    stats:
      update_period_hour: 1
      max_buffer_decrease_by_period_mb: 500
      min_ratio: 0.65
      target_ratio: 1.2
  - name: red
    stats:
      update_period_hour: 6
  - name: green
"#;

    #[test]
    fn parses_and_fills_defaults() {
        let config = MonitorConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.history_depth, 20);
        assert_eq!(config.tick_unit(), Duration::from_secs(60));
        assert_eq!(config.dashboard_output, None);

        let blue = config.tracker("blue").unwrap();
        assert!(blue.autosnatch);
        let blue_stats = blue.stats.unwrap();
        assert_eq!(blue_stats.max_buffer_decrease_mb, 500);
        assert_eq!(blue_stats.minimum_ratio, 0.65);

        let red = config.tracker("red").unwrap().stats.unwrap();
        assert_eq!(red.minimum_ratio, WARNING_RATIO);
        assert_eq!(red.target_ratio, DEFAULT_TARGET_RATIO);
        assert_eq!(red.max_buffer_decrease_mb, 0);

        let names: Vec<_> = config.monitored().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["blue", "red"]);
    }

    #[test]
    fn top_level_defaults() {
        let config = MonitorConfig::from_yaml_str("trackers: []").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn tick_unit_bounds() {
        let mut config = MonitorConfig { tick_unit_secs: u64::MAX, ..MonitorConfig::default() };
        assert!(matches!(config.check(), Err(ConfigError::Invalid { .. })));
        config.tick_unit_secs = MAX_TICK_UNIT_SECS;
        assert!(config.check().is_ok());
        config.tick_unit_secs = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn zero_period_is_invalid() {
        let err = StatsConfig::new(0, 10).check("blue").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref tracker, .. } if tracker == "blue"));
    }

    #[test]
    fn ratio_rules() {
        assert!(StatsConfig::new(1, 0).with_minimum_ratio(0.5).check("b").is_err());
        assert!(StatsConfig::new(1, 0).with_target_ratio(0.6).check("b").is_err());
        assert!(StatsConfig::new(1, 0)
            .with_minimum_ratio(0.9)
            .with_target_ratio(0.8)
            .check("b")
            .is_err());
        assert!(StatsConfig::new(1, 0)
            .with_minimum_ratio(0.9)
            .with_target_ratio(0.9)
            .check("b")
            .is_ok());
    }

    #[test]
    fn names_must_be_unique_and_present() {
        let mut dup = MonitorConfig {
            trackers: vec![TrackerConfig::unmonitored("blue"), TrackerConfig::unmonitored("blue")],
            ..MonitorConfig::default()
        };
        assert!(dup.check().is_err());

        let mut empty = MonitorConfig {
            trackers: vec![TrackerConfig::unmonitored(" ")],
            ..MonitorConfig::default()
        };
        assert!(empty.check().is_err());
    }

    #[test]
    fn settings_resolve_thresholds_and_targets() {
        let settings = StatsConfig::new(3, 100)
            .with_minimum_ratio(0.7)
            .settings("blue")
            .unwrap();
        assert_eq!(settings.period_hours, 3);
        assert_eq!(settings.thresholds, PolicyThresholds::new(0.7, 100));
        assert_eq!(settings.targets, RatioTargets::default());
    }

    #[test]
    fn unknown_yaml_is_a_parse_error() {
        assert!(matches!(
            MonitorConfig::from_yaml_str("trackers: 12"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = MonitorConfig::load("/nonexistent/seedwatch.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
