//! Plain-text dashboard
//!
//! One table per tracker, newest sample first, built from the progress row
//! cells. Deploying writes the last rendering to the configured file.

use crate::collaborators::{DashboardBuilder, HistoryWindow};
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use seedwatch_stats::{to_row, RatioTargets};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::path::PathBuf;

const HEADER: [&str; 7] = ["", "Date", "Up", "Down", "Buffer", "Warning Buffer", "Ratio"];

/// Dashboard rendered as aligned text tables
#[derive(Debug, Default)]
pub struct TextDashboard {
    targets: HashMap<String, RatioTargets>,
    output: Option<PathBuf>,
    rendered: RwLock<String>,
}

impl TextDashboard {
    /// Create a dashboard with per-tracker ratio targets
    ///
    /// Trackers missing from `targets` use the default targets.
    #[must_use]
    pub fn new(targets: HashMap<String, RatioTargets>, output: Option<PathBuf>) -> Self {
        Self {
            targets,
            output,
            rendered: RwLock::new(String::new()),
        }
    }

    /// Last rendering
    #[must_use]
    pub fn rendered(&self) -> String {
        self.rendered.read().clone()
    }

    fn render_tracker(
        &self,
        out: &mut String,
        tracker: &str,
        window: &HistoryWindow,
    ) -> fmt::Result {
        let targets = self.targets.get(tracker).copied().unwrap_or_default();

        let mut rows = vec![HEADER.iter().map(|h| (*h).to_string()).collect::<Vec<_>>()];
        rows.extend(window.rows().map(|(current, previous)| to_row(current, previous, &targets)));

        let mut widths = [0usize; HEADER.len()];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        writeln!(out, "== {tracker} ==")?;
        for row in &rows {
            let line: Vec<String> = row
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(out, "{}", line.join(" | ").trim_end())?;
        }
        writeln!(out)
    }
}

#[async_trait]
impl DashboardBuilder for TextDashboard {
    async fn rebuild(&self, history: &BTreeMap<String, HistoryWindow>) -> anyhow::Result<()> {
        let mut out = String::new();
        for (tracker, window) in history {
            self.render_tracker(&mut out, tracker, window)
                .with_context(|| format!("rendering dashboard table for {tracker}"))?;
        }
        *self.rendered.write() = out;
        tracing::debug!(trackers = history.len(), "dashboard rebuilt");
        Ok(())
    }

    async fn deploy(&self) -> anyhow::Result<()> {
        let Some(path) = &self.output else {
            tracing::debug!("no dashboard output configured");
            return Ok(());
        };
        let content = self.rendered();
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("writing dashboard to {}", path.display()))?;
        tracing::info!(path = %path.display(), "dashboard deployed");
        Ok(())
    }
}
