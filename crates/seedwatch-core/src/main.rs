//! `seedwatch` command line: configuration check and history replay

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use parking_lot::Mutex;
use seedwatch_core::{
    HealthMonitor, LogNotifier, ManualClock, MemoryHistoryStore, MonitorConfig, MonitorContext,
    PeriodGroups, TextDashboard, TrackerClient,
};
use seedwatch_stats::{Counters, Snapshot, ROW_TIMESTAMP_FORMAT};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new("seedwatch")
        .version(seedwatch_core::VERSION)
        .about("Tracker account health monitor")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("check")
                .about("Validate a configuration and print its period groups")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a legacy history file through the health monitor")
                .arg(config_arg())
                .arg(
                    Arg::new("tracker")
                        .long("tracker")
                        .required(true)
                        .help("Tracker to replay"),
                )
                .arg(
                    Arg::new("history")
                        .long("history")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Rows of unix_ts,uploaded,downloaded,ratio"),
                ),
        );

    let matches = cli.get_matches();
    init_logging(matches.get_flag("log-json"))?;

    match matches.subcommand() {
        Some(("check", args)) => check(path_arg(args, "config")?),
        Some(("replay", args)) => {
            let tracker = args
                .get_one::<String>("tracker")
                .ok_or_else(|| anyhow!("--tracker is required"))?;
            replay(path_arg(args, "config")?, tracker, path_arg(args, "history")?).await
        }
        _ => bail!("unknown command"),
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("YAML configuration file")
}

fn path_arg<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow!("--{id} is required"))
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("seedwatch=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn check(config_path: &Path) -> Result<()> {
    let config = MonitorConfig::load(config_path)?;
    let settings = config
        .monitored()
        .map(|(name, stats)| stats.settings(name).map(|s| (name, s)))
        .collect::<Result<Vec<_>, _>>()?;
    let groups = PeriodGroups::from_settings(settings.iter().map(|(name, s)| (*name, s)));

    println!("Configuration OK: {} tracker(s)", config.trackers.len());
    for (period, trackers) in groups.iter() {
        println!("  every {period}h: {}", trackers.join(", "));
    }
    for tracker in config.trackers.iter().filter(|t| t.stats.is_none()) {
        println!("  not monitored: {}", tracker.name);
    }
    Ok(())
}

/// Serves counters from a replayed history, one row per fetch
#[derive(Debug, Default)]
struct ReplayClient {
    queue: Mutex<VecDeque<Counters>>,
}

#[async_trait]
impl TrackerClient for ReplayClient {
    async fn fetch_counters(&self, tracker: &str) -> Result<Counters> {
        self.queue
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("replay history for {tracker} exhausted"))
    }
}

async fn replay(config_path: &Path, tracker: &str, history_path: &Path) -> Result<()> {
    let config = MonitorConfig::load(config_path)?;
    let settings = config
        .tracker(tracker)
        .and_then(|t| t.stats.as_ref())
        .ok_or_else(|| anyhow!("tracker {tracker} has no stats configuration"))?
        .settings(tracker)?;

    let history = read_history(tracker, history_path)?;
    if history.is_empty() {
        bail!("no usable rows in {}", history_path.display());
    }

    let clock = Arc::new(ManualClock::new(history[0].timestamp));
    let client = Arc::new(ReplayClient::default());
    let dashboard = Arc::new(TextDashboard::new(
        HashMap::from([(tracker.to_string(), settings.targets)]),
        config.dashboard_output.clone(),
    ));
    let ctx = MonitorContext::new(
        config,
        Arc::new(MemoryHistoryStore::new()),
        client.clone(),
        Arc::new(LogNotifier),
        dashboard.clone(),
    )?
    .with_clock(clock.clone());
    let monitor = HealthMonitor::new(ctx);

    for snapshot in &history {
        clock.set(snapshot.timestamp);
        client.queue.lock().push_back(snapshot.counters());
        let outcome = monitor.process_tracker(tracker).await;
        println!("{} {outcome}", snapshot.timestamp.format(ROW_TIMESTAMP_FORMAT));
    }
    monitor.refresh_dashboard().await;

    println!();
    print!("{}", dashboard.rendered());
    let tripped = monitor.context().breaker().is_tripped(tracker);
    let state = if tripped { "tripped" } else { "closed" };
    println!("autosnatch breaker for {tracker}: {state}");
    Ok(())
}

fn read_history(tracker: &str, path: &Path) -> Result<Vec<Snapshot>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading history {}", path.display()))?;
    let mut history = Vec::new();
    for (line, row) in raw.lines().enumerate() {
        let row = row.trim();
        if row.is_empty() || row.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = row.split(',').collect();
        match Snapshot::from_record(tracker, &fields) {
            Ok(snapshot) => history.push(snapshot),
            Err(e) => tracing::warn!(line = line + 1, error = %e, "skipping history row"),
        }
    }
    history.sort_by_key(|s| s.timestamp);
    Ok(history)
}
