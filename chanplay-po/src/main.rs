//! Chanplay Playout (chanplay-po) - Main entry point
//!
//! Serves the playout HTTP API and ticker, and offers one-shot
//! maintenance commands (import, reschedule, publish) against the same
//! database.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chanplay_common::config::{load_toml_config_or_default, ServiceConfig, ENV_CONFIG};
use chanplay_common::db::init_database;
use chanplay_common::duration::format_clock;
use chanplay_common::time::{canonical, parse_day, parse_time_of_day};
use chanplay_po::api::{build_router, AppState};
use chanplay_po::clock::SystemClock;
use chanplay_po::import::{import, ImportFile};
use chanplay_po::reschedule::RescheduleTarget;
use chanplay_po::ticker::PlayoutTicker;
use chanplay_po::PlayoutService;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Command-line arguments for chanplay-po
#[derive(Parser, Debug)]
#[command(name = "chanplay-po")]
#[command(about = "Multi-channel playout scheduling service")]
#[command(version)]
struct Args {
    /// TOML bootstrap file
    #[arg(long, global = true, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API and playout ticker (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Import channels and programs from a JSON file
    Import { file: PathBuf },

    /// Chain a day's programs from a base time
    Reschedule {
        /// Channel to reschedule
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        channel: Option<Uuid>,

        /// Reschedule every channel
        #[arg(long)]
        all: bool,

        /// UTC day (YYYY-MM-DD)
        #[arg(long)]
        day: String,

        /// UTC time of day to start from (HH:MM:SS)
        #[arg(long)]
        base: Option<String>,

        /// Print the would-be starts without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Publish the current draft of a channel/day
    Publish {
        #[arg(long)]
        channel: Uuid,

        /// UTC day (YYYY-MM-DD)
        #[arg(long)]
        day: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config_or_default(args.config.as_deref());
    let cli_port = match &args.command {
        Some(Command::Serve { port }) => *port,
        _ => None,
    };
    let config = ServiceConfig::resolve(args.database.clone(), cli_port, toml_config);

    init_tracing(&config)?;

    // Log version immediately after tracing init
    info!("Starting Chanplay Playout (chanplay-po) v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database_path.display());

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let service = Arc::new(PlayoutService::sqlite(
        pool,
        Arc::new(SystemClock),
        &config.playout,
    ));

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { .. } => serve(service, &config).await,
        Command::Import { file } => run_import(&service, file).await,
        Command::Reschedule {
            channel,
            all,
            day,
            base,
            dry_run,
        } => {
            let day = day_arg(&day)?;
            let base = base_arg(base.as_deref())?;
            let target = match (channel, all) {
                (Some(channel_id), false) => RescheduleTarget::Channel(channel_id),
                (None, true) => RescheduleTarget::All,
                _ => bail!("Specify exactly one of --channel or --all"),
            };
            run_reschedule(&service, target, day, base, dry_run).await
        }
        Command::Publish { channel, day } => {
            let day = day_arg(&day)?;
            let outcome = service
                .publish_draft(channel, day)
                .await
                .with_context(|| format!("Publish of channel {channel} on {day} failed"))?;
            println!(
                "Published draft v{} for {} on {}: {} programs",
                outcome.version, channel, day, outcome.published
            );
            Ok(())
        }
    }
}

fn init_tracing(config: &ServiceConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;

    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

fn day_arg(raw: &str) -> Result<NaiveDate> {
    parse_day(raw).with_context(|| format!("Invalid day {raw:?} (expected YYYY-MM-DD)"))
}

fn base_arg(raw: Option<&str>) -> Result<Option<NaiveTime>> {
    raw.map(|raw| parse_time_of_day(raw).with_context(|| format!("Invalid base {raw:?} (expected HH:MM:SS)")))
        .transpose()
}

async fn serve(service: Arc<PlayoutService>, config: &ServiceConfig) -> Result<()> {
    let ticker = Arc::new(PlayoutTicker::new(
        service.clone(),
        Duration::from_millis(config.playout.poll_interval_ms),
    ));
    let ticker_task = ticker.run();

    let app = build_router(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    ticker_task.abort();
    info!("Server shutdown complete");
    Ok(())
}

async fn run_import(service: &PlayoutService, file: PathBuf) -> Result<()> {
    let parsed = ImportFile::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let report = import(service, parsed).await.context("Import failed")?;

    println!(
        "Imported {} channels, {} programs ({} skipped: invalid start, {} skipped: unknown channel)",
        report.channels_created,
        report.programs_imported,
        report.rejected.len(),
        report.unknown_channel.len()
    );
    for (a, b) in &report.overlaps {
        println!("  overlap: '{a}' / '{b}'");
    }
    Ok(())
}

async fn run_reschedule(
    service: &PlayoutService,
    target: RescheduleTarget,
    day: NaiveDate,
    base: Option<NaiveTime>,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        let channels = match target {
            RescheduleTarget::Channel(channel_id) => vec![service.channel(channel_id).await?],
            RescheduleTarget::All => service.list_channels().await?,
        };
        for channel in channels {
            println!("{} ({})", channel.name, channel.id);
            for row in service.preview_reschedule(channel.id, day, base).await? {
                println!(
                    "  {} {} -> {}  [{}] {}",
                    if row.changed { "*" } else { " " },
                    canonical(row.old_start),
                    canonical(row.new_start),
                    format_clock(row.program.duration_seconds),
                    row.program.title
                );
            }
        }
        return Ok(());
    }

    let report = service
        .apply_reschedule(target, day, base)
        .await
        .context("Reschedule failed")?;
    println!(
        "Rescheduled {} programs on {} from {}",
        report.affected,
        day,
        canonical(report.base_instant)
    );
    for outcome in &report.channels {
        match &outcome.error {
            None => println!("  {}: {} changed", outcome.channel_id, outcome.affected),
            Some(e) => {
                warn!("Channel {} failed: {}", outcome.channel_id, e);
                println!("  {}: FAILED ({})", outcome.channel_id, e);
            }
        }
    }
    if report.failed().next().is_some() {
        bail!("Some channels could not be rescheduled");
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
