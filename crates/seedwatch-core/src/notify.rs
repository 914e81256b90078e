//! Log-backed notifier

use crate::collaborators::{Notifier, Severity};
use async_trait::async_trait;

/// Notifier writing every message to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str, tracker: &str, severity: Severity) -> anyhow::Result<()> {
        match severity {
            Severity::Info => tracing::info!(tracker, "{message}"),
            Severity::Error => tracing::error!(tracker, "{message}"),
        }
        Ok(())
    }
}
