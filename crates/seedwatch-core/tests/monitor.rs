use chrono::Duration;
use pretty_assertions::assert_eq;
use seedwatch_core::{
    EntryKind, HealthMonitor, HistoryStore, MonitorConfig, MonitorContext, MonitorError, Severity,
    SkipReason, TextDashboard, TrackerConfig, TrackerOutcome,
};
use seedwatch_stats::RejectReason;
use seedwatch_test_utils::{at, config, counters, Harness};
use std::sync::Arc;

#[tokio::test]
async fn first_sample_is_accepted_and_reported() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6)]));
    harness.client.push("blue", counters(1000, 1000, 1.0));

    assert_eq!(monitor.process_tracker("blue").await, TrackerOutcome::Accepted);

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].severity, Severity::Info);
    assert_eq!(
        sent[0].message,
        "Buffer: +0.000B | Ratio: 1.000 | Up: 1000.000MB | Down: 1000.000MB | Warning Buffer: +666.667MB"
    );
    assert!(!monitor.context().breaker().is_tripped("blue"));
}

#[tokio::test]
async fn buffer_drop_trips_breaker_and_alerts() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6)]));
    harness.client.push("blue", counters(1000, 1000, 1.0));
    harness.client.push("blue", counters(1050, 2000, 0.95));

    assert_eq!(monitor.process_tracker("blue").await, TrackerOutcome::Accepted);
    harness.clock.advance(Duration::hours(1));
    assert_eq!(
        monitor.process_tracker("blue").await,
        TrackerOutcome::Rejected(RejectReason::BufferDropExceeded)
    );

    let breaker = monitor.context().breaker();
    assert!(breaker.is_tripped("blue"));
    assert!(!breaker.autosnatch_enabled(monitor.context().config(), "blue"));

    let alerts = harness.notifier.errors_for("blue");
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Buffer"));
}

#[tokio::test]
async fn low_ratio_alert_names_ratio() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 0, 0.7)]));
    harness.client.push("blue", counters(90, 145, 0.62));

    assert_eq!(
        monitor.process_tracker("blue").await,
        TrackerOutcome::Rejected(RejectReason::RatioBelowMinimum)
    );
    assert!(harness.notifier.errors_for("blue")[0].contains("Ratio"));
}

#[tokio::test]
async fn unreachable_tracker_does_not_stop_the_tick() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6), ("red", 1, 100, 0.6)]));
    harness.client.push_failure("blue", "connection refused");
    harness.client.push("red", counters(10, 5, 2.0));

    let report = monitor.tick(1).await;
    assert_eq!(
        report.outcome("blue"),
        Some(TrackerOutcome::Skipped(SkipReason::TrackerUnreachable))
    );
    assert_eq!(report.outcome("red"), Some(TrackerOutcome::Accepted));

    let errors = harness.notifier.errors_for("blue");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error getting stats"));
    assert!(harness.store.inner().most_recent("blue", 1).await.is_err());
}

#[tokio::test]
async fn persistence_failures_skip_only_that_tracker() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6), ("red", 1, 100, 0.6)]));
    harness.store.fail_saves_for("blue");
    harness.client.push("blue", counters(10, 5, 2.0));
    harness.client.push("red", counters(10, 5, 2.0));

    let report = monitor.tick(1).await;
    assert_eq!(report.outcome("blue"), Some(TrackerOutcome::Skipped(SkipReason::Persistence)));
    assert_eq!(report.outcome("red"), Some(TrackerOutcome::Accepted));
    assert_eq!(report.skipped(), 1);
}

#[tokio::test]
async fn read_failure_skips_evaluation() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6)]));
    harness.store.fail_reads();
    harness.client.push("blue", counters(1, 100, 0.1));

    assert_eq!(
        monitor.process_tracker("blue").await,
        TrackerOutcome::Skipped(SkipReason::Persistence)
    );
    assert!(!monitor.context().breaker().is_tripped("blue"));
}

#[tokio::test]
async fn unmonitored_tracker_is_skipped_silently() {
    let harness = Harness::new();
    let mut config = config(&[("blue", 1, 100, 0.6)]);
    config.trackers.push(TrackerConfig::unmonitored("green"));
    let monitor = harness.monitor(config);

    assert_eq!(
        monitor.process_tracker("green").await,
        TrackerOutcome::Skipped(SkipReason::ConfigurationMissing)
    );
    assert_eq!(harness.client.calls(), 0);
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn notifier_failures_are_swallowed() {
    let harness = Harness::new();
    harness.notifier.fail();
    let monitor = harness.monitor(config(&[("blue", 1, 0, 0.9)]));
    harness.client.push("blue", counters(10, 10, 0.5));

    assert_eq!(
        monitor.process_tracker("blue").await,
        TrackerOutcome::Rejected(RejectReason::RatioBelowMinimum)
    );
    assert!(monitor.context().breaker().is_tripped("blue"));
}

#[tokio::test]
async fn dashboard_refreshes_once_per_tick() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[
        ("blue", 1, 100, 0.6),
        ("red", 1, 100, 0.6),
        ("green", 6, 100, 0.6),
    ]));
    for tracker in ["blue", "red"] {
        harness.client.push(tracker, counters(10, 5, 2.0));
    }

    let report = monitor.tick(1).await;
    assert_eq!(report.period_hours, Some(1));
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(harness.dashboard.rebuilds(), 1);
    assert_eq!(harness.dashboard.deploys(), 1);

    let history = harness.dashboard.last_history();
    assert_eq!(history.keys().collect::<Vec<_>>(), vec!["blue", "red"]);
}

#[tokio::test]
async fn dashboard_window_reads_one_past_history_depth() {
    let harness = Harness::new();
    let mut config = config(&[("blue", 1, 100, 0.6)]);
    config.history_depth = 2;
    let monitor = harness.monitor(config);
    for up in [100, 110, 120] {
        harness.client.push("blue", counters(up, 50, 2.0));
        monitor.process_tracker("blue").await;
        harness.clock.advance(Duration::hours(1));
    }

    monitor.refresh_dashboard().await;
    let history = harness.dashboard.last_history();
    let window = &history["blue"];
    assert_eq!(window.newest_first.len(), 3);
    assert!(!window.complete);
    assert_eq!(window.rows().count(), 2);
}

#[tokio::test]
async fn cut_dashboard_window_shows_no_first_sample() {
    let harness = Harness::new();
    let mut config = config(&[("blue", 1, 100, 0.6)]);
    config.history_depth = 2;
    let dashboard = Arc::new(TextDashboard::default());
    let ctx = MonitorContext::new(
        config,
        harness.store.clone(),
        harness.client.clone(),
        harness.notifier.clone(),
        dashboard.clone(),
    )
    .unwrap()
    .with_clock(harness.clock.clone());
    let monitor = HealthMonitor::new(ctx);
    for up in [100, 110, 120] {
        harness.client.push("blue", counters(up, 50, 2.0));
        monitor.process_tracker("blue").await;
        harness.clock.advance(Duration::hours(1));
    }

    monitor.refresh_dashboard().await;
    let text = dashboard.rendered();
    let rows: Vec<_> = text.lines().skip(2).filter(|l| !l.is_empty()).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("+ | 2024-07-01 02:00"));
    assert!(rows[1].starts_with("+ | 2024-07-01 01:00"));
    assert!(!text.contains("* |"));
}

#[tokio::test]
async fn dashboard_refreshes_even_when_everything_fails() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6)]));

    let report = monitor.tick(1).await;
    assert_eq!(report.skipped(), 1);
    assert_eq!(harness.dashboard.rebuilds(), 1);
}

#[tokio::test]
async fn failed_rebuild_is_not_deployed() {
    let harness = Harness::new();
    harness.dashboard.fail();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6)]));
    monitor.refresh_dashboard().await;

    assert_eq!(harness.dashboard.rebuilds(), 1);
    assert_eq!(harness.dashboard.deploys(), 0);
}

#[tokio::test]
async fn store_init_failure_is_fatal() {
    let harness = Harness::new();
    harness.store.fail_init();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6)]));

    let err = monitor.run().await.unwrap_err();
    assert!(matches!(err, MonitorError::StoreInit(_)));
    assert_eq!(harness.client.calls(), 0);
}

#[tokio::test]
async fn startup_pass_covers_every_group() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 1, 100, 0.6), ("red", 4, 100, 0.6)]));
    harness.client.push("blue", counters(10, 5, 2.0));
    harness.client.push("red", counters(10, 5, 2.0));

    let report = monitor.startup().await;
    assert_eq!(report.period_hours, None);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.rejected() + report.skipped(), 0);
    assert_eq!(harness.dashboard.deploys(), 1);
}

#[tokio::test]
async fn rollup_persists_start_of_day_entries() {
    let harness = Harness::new();
    let monitor = harness.monitor(config(&[("blue", 12, 0, 0.6)]));
    for (hours, up) in [(12, 100), (36, 200), (60, 300)] {
        harness.clock.set(at(hours));
        harness.client.push("blue", counters(up, 10, 2.0));
        monitor.process_tracker("blue").await;
    }

    // 2024-07-03 18:00: days 1 and 2 can be rolled up, the 3rd is today
    harness.clock.set(at(66));
    assert_eq!(monitor.update_rollups().await, 2);
    assert_eq!(monitor.update_rollups().await, 0);

    let days = harness.store.inner().entries("blue", EntryKind::StartOfDay).await.unwrap();
    let stamps: Vec<_> = days.iter().map(|d| d.timestamp).collect();
    assert_eq!(stamps, vec![at(0), at(24)]);
    assert!(days[0].start_of_week && days[0].start_of_month);
    assert!(days.iter().all(|d| !d.collected));

    // synthetic entries never become the "previous sample"
    let recent = harness.store.inner().most_recent("blue", 10).await.unwrap();
    assert_eq!(recent.len(), 3);
}

#[tokio::test]
async fn empty_configuration_builds() {
    let harness = Harness::new();
    let monitor = harness.monitor(MonitorConfig::default());
    assert!(monitor.groups().is_empty());
    assert!(monitor.startup().await.outcomes.is_empty());
}
