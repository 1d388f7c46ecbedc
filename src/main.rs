use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tracing::info;

use stintwatch::schedule::format_countdown;
use stintwatch::{
    JsonExporter, RaceMonitor, RaceStore, ScheduleSource, ScheduledEvent, SeriesSourceFactory,
    Series, SnapshotSource, SourceFactory, StaticSchedule, TrackerConfig, YamlScheduleFile,
};

#[derive(Parser, Debug)]
#[command(name = "stintwatch", version)]
#[command(about = "Live-timing monitor and ingestion service for endurance races")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "STINTWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// YAML schedule file (defaults to the built-in calendar)
    #[arg(long, env = "STINTWATCH_SCHEDULE", global = true)]
    schedule: Option<PathBuf>,

    /// User-Agent sent to timing providers
    #[arg(long, env = "USER_AGENT", global = true)]
    user_agent: Option<String>,

    /// Headless browser executable
    #[arg(long, env = "CHROME_PATH", global = true)]
    chrome_path: Option<String>,

    /// Seconds one fetch may take
    #[arg(long, env = "FETCH_TIMEOUT", global = true)]
    fetch_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor the schedule and ingest live races until stopped
    Run(RunArgs),
    /// Show the next scheduled race
    Next,
    /// List upcoming races
    Upcoming {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Fetch one snapshot and print it as JSON
    Fetch {
        #[arg(long, default_value = "WEC")]
        series: Series,

        /// Timing page (defaults to the series' endpoint)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Seconds between snapshot fetches
    #[arg(long, env = "SCRAPE_INTERVAL")]
    scrape_interval: Option<u64>,

    /// Seconds between schedule polls
    #[arg(long, env = "MONITOR_INTERVAL")]
    poll_interval: Option<u64>,

    /// Directory for race exports
    #[arg(long, env = "EXPORT_DIR")]
    export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stintwatch=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => TrackerConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    match cli.command {
        Command::Run(args) => {
            if let Some(secs) = args.scrape_interval {
                config.ingest_interval_secs = secs;
            }
            if let Some(secs) = args.poll_interval {
                config.monitor_poll_interval_secs = secs;
            }
            if let Some(dir) = args.export_dir {
                config.export_dir = dir;
            }
            config.validate().context("invalid configuration")?;
            run(config).await
        }
        Command::Next => {
            config.validate().context("invalid configuration")?;
            next(&config).await
        }
        Command::Upcoming { limit } => {
            config.validate().context("invalid configuration")?;
            upcoming(&config, limit).await
        }
        Command::Fetch { series, endpoint } => {
            config.validate().context("invalid configuration")?;
            fetch(&config, series, endpoint).await
        }
    }
}

fn apply_overrides(config: &mut TrackerConfig, cli: &Cli) {
    if let Some(path) = &cli.schedule {
        config.schedule_file = Some(path.clone());
    }
    if let Some(user_agent) = &cli.user_agent {
        config.user_agent = user_agent.clone();
    }
    if let Some(binary) = &cli.chrome_path {
        config.browser_binary = binary.clone();
    }
    if let Some(secs) = cli.fetch_timeout {
        config.fetch_timeout_secs = secs;
    }
}

fn schedule_source(config: &TrackerConfig) -> Arc<dyn ScheduleSource> {
    match &config.schedule_file {
        Some(path) => Arc::new(YamlScheduleFile::new(path)),
        None => Arc::new(StaticSchedule::builtin()),
    }
}

async fn run(config: TrackerConfig) -> anyhow::Result<()> {
    let store = RaceStore::new();
    let monitor = RaceMonitor::new(
        schedule_source(&config),
        Arc::new(SeriesSourceFactory::new(config.source_settings())),
        Arc::new(store.clone()),
        Arc::new(JsonExporter::new(store, &config.export_dir)),
        config.monitor_settings()?,
    );

    info!(
        scrape_interval = config.ingest_interval_secs,
        poll_interval = config.monitor_poll_interval_secs,
        export_dir = %config.export_dir.display(),
        "stintwatch starting"
    );

    let mut handle = monitor.spawn();

    let mut updates = handle.status_updates();
    tokio::spawn(async move {
        let mut last = None;
        while let Some(status) = updates.next().await {
            let key = (status.state, status.current_event.clone());
            if last.as_ref() != Some(&key) {
                info!(state = %status.state, event = ?status.current_event, "Monitor status");
                last = Some(key);
            }
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    handle.stop_monitoring().await;
    info!("stintwatch stopped");
    Ok(())
}

async fn next(config: &TrackerConfig) -> anyhow::Result<()> {
    let schedule = schedule_source(config).load().await?;
    let now = Utc::now();
    match schedule.next_event(now) {
        Some(event) => {
            print_event(event);
            println!("  starts in {}", format_countdown(event.scheduled_start - now));
        }
        None => println!("No upcoming races"),
    }
    Ok(())
}

async fn upcoming(config: &TrackerConfig, limit: usize) -> anyhow::Result<()> {
    let schedule = schedule_source(config).load().await?;
    let events = schedule.upcoming(Utc::now(), limit);
    if events.is_empty() {
        println!("No upcoming races");
    }
    for event in events {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &ScheduledEvent) {
    println!(
        "{} [{}] {} - {}",
        event.scheduled_start.format("%Y-%m-%d %H:%M UTC"),
        event.series,
        event.name,
        event.track
    );
}

async fn fetch(config: &TrackerConfig, series: Series, endpoint: Option<String>) -> anyhow::Result<()> {
    let mut event = ScheduledEvent::new("One-off fetch", series, "", Utc::now());
    if let Some(endpoint) = endpoint {
        event = event.with_endpoint(endpoint);
    }

    let factory = SeriesSourceFactory::new(config.source_settings());
    let mut source = factory.create(&event)?;
    source.open().await.context("opening timing source")?;
    let snapshot = source.fetch_snapshot().await;
    source.close().await;

    let snapshot = snapshot.with_context(|| format!("fetching {}", event.source_endpoint))?;
    if snapshot.is_empty() {
        bail!("timing page for {series} has no cars");
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Wait for SIGTERM or ctrl-c.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => info!("SIGTERM received"),
                _ = tokio::signal::ctrl_c() => info!("ctrl-c received"),
            }
        }
        Err(_) => {
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}
