mod config;
mod di;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use sync_application::{
    DateSyncRequest, FullSyncRequest, HealthStatus, IncrementalRequest, JobStatus, StatusReport,
    SyncReport,
};
use sync_domain::{parse_flexible, DateRange};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, Provider};
use crate::di::{create_app, App};

#[derive(Parser)]
#[command(name = "ashare-sync")]
#[command(about = "Synchronize A-share daily market data into local Parquet files", long_about = None)]
struct Cli {
    /// Local data directory (overrides ASHARE_DATA_DIR and the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Optional TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    provider: Option<Provider>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download per-symbol history for every listed stock.
    Full {
        #[arg(long)]
        days: Option<u32>,

        #[command(flatten)]
        pacing: Pacing,

        /// Ignore an interrupted run's checkpoint and start over.
        #[arg(long)]
        no_resume: bool,
    },
    /// Append new trading days to symbols already stored locally.
    Incremental {
        #[command(flatten)]
        pacing: Pacing,
    },
    /// Fill missing whole-market date partitions.
    ByDate {
        #[arg(long, conflicts_with_all = ["start", "end"])]
        days: Option<u32>,

        #[arg(long, requires = "end")]
        start: Option<String>,

        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Refetch every date, not just the gaps.
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        pacing: Pacing,
    },
    /// Pack the data directory into a .tar.gz.
    Export {
        #[arg(long, default_value = "export")]
        out: PathBuf,
    },
    /// Unpack an exported archive into the data directory.
    Import {
        archive: PathBuf,

        #[arg(long)]
        overwrite: bool,
    },
    /// Show stored data and sync progress.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Probe the upstream API once.
    Health,
}

#[derive(Args)]
struct Pacing {
    /// Seconds to wait between upstream calls.
    #[arg(long)]
    delay: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }

    match cli.command {
        Command::Full {
            days,
            pacing,
            no_resume,
        } => {
            apply_pacing(&mut config, &pacing)?;
            config.require_token()?;
            let request = FullSyncRequest {
                days: days.unwrap_or(config.sync.default_days),
                end_date: yesterday(),
                resume: !no_resume,
            };
            let app = start(&config);
            let report = with_ctrl_c(&app, app.sync.full_sync(request)).await?;
            Ok(print_report(&report))
        }
        Command::Incremental { pacing } => {
            apply_pacing(&mut config, &pacing)?;
            config.require_token()?;
            let app = start(&config);
            let request = IncrementalRequest { end_date: today() };
            let report = with_ctrl_c(&app, app.sync.incremental_sync(request)).await?;
            Ok(print_report(&report))
        }
        Command::ByDate {
            days,
            start: from,
            end: to,
            force,
            pacing,
        } => {
            apply_pacing(&mut config, &pacing)?;
            config.require_token()?;
            let range = match (from, to) {
                (Some(from), Some(to)) => DateRange::new(
                    parse_flexible(&from).with_context(|| format!("invalid --start {from}"))?,
                    parse_flexible(&to).with_context(|| format!("invalid --end {to}"))?,
                )?,
                _ => DateRange::trailing(today(), days.unwrap_or(config.sync.default_days))?,
            };
            let app = start(&config);
            let report = with_ctrl_c(&app, app.sync.sync_by_date(DateSyncRequest { range, force }))
                .await?;
            Ok(print_report(&report))
        }
        Command::Export { out } => {
            let app = start(&config);
            let archiver = app.archiver.clone();
            let stamp = Local::now().naive_local();
            let report = tokio::task::spawn_blocking(move || archiver.export(&out, stamp)).await??;
            println!(
                "Exported {} files to {} ({})",
                report.files,
                report.path.display(),
                human_bytes(report.bytes)
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Import { archive, overwrite } => {
            let app = start(&config);
            let archiver = app.archiver.clone();
            let report =
                tokio::task::spawn_blocking(move || archiver.import(&archive, overwrite)).await??;
            println!(
                "Imported {} files ({}) into {}",
                report.files,
                human_bytes(report.bytes),
                config.data_dir.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { json } => {
            let app = start(&config);
            let report = app.status.report().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&config, &report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            config.require_token()?;
            let app = start(&config);
            match app.health.check(yesterday()).await {
                HealthStatus::Healthy => {
                    println!("Upstream API is healthy");
                    Ok(ExitCode::SUCCESS)
                }
                HealthStatus::Degraded(reason) => {
                    println!("Upstream API is degraded: {reason}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn start(config: &AppConfig) -> App {
    info!(
        "Using {:?} provider, data directory {}",
        config.provider,
        config.data_dir.display()
    );
    create_app(config)
}

fn apply_pacing(config: &mut AppConfig, pacing: &Pacing) -> anyhow::Result<()> {
    if let Some(delay) = pacing.delay {
        config.set_delay(delay)?;
    }
    Ok(())
}

/// Runs a sync to completion; Ctrl+C asks it to stop at the next symbol or
/// date boundary so the checkpoint stays consistent.
async fn with_ctrl_c<F>(app: &App, run: F) -> F::Output
where
    F: std::future::Future,
{
    let sync = app.sync.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current item...");
            sync.request_stop();
        }
    });

    let output = run.await;
    watcher.abort();
    output
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn yesterday() -> NaiveDate {
    today().checked_sub_days(Days::new(1)).unwrap_or_else(today)
}

fn headline(report: &SyncReport) -> &'static str {
    if report.aborted_reason.is_some() && !report.interrupted {
        return "Sync aborted";
    }
    match report.final_status() {
        JobStatus::Completed => "Sync completed",
        JobStatus::Interrupted => "Sync interrupted",
        _ => "Sync finished with failures",
    }
}

fn print_report(report: &SyncReport) -> ExitCode {
    println!("\n{} ({}):", headline(report), report.mode);
    if let Some(range) = &report.range {
        println!("  Range: {} .. {}", range.start(), range.end());
    }
    println!("  New symbols: {}", report.new);
    println!("  Updated symbols: {}", report.updated);
    println!("  Skipped: {}", report.skipped);
    println!("  Failed: {}", report.failed);
    if report.dates > 0 {
        println!("  Dates written: {}", report.dates);
    }
    println!("  Records: {}", report.records);
    if report.indicator_dates > 0 {
        println!("  Indicator partitions: {}", report.indicator_dates);
    }

    if !report.failed_codes.is_empty() {
        let shown: Vec<&str> = report.failed_codes.iter().take(20).map(|c| c.as_str()).collect();
        println!("\n  Failed symbols: {}", shown.join(", "));
        if report.failed_codes.len() > shown.len() {
            println!("    ... and {} more", report.failed_codes.len() - shown.len());
        }
    }
    if !report.failed_dates.is_empty() {
        println!("\n  Failed dates:");
        for (date, error) in &report.failed_dates {
            println!("    {} - {}", date, error);
        }
    }

    if report.interrupted {
        println!("\nInterrupted; progress was saved and the next run resumes from it.");
        return ExitCode::from(130);
    }
    if let Some(reason) = &report.aborted_reason {
        println!("\nAborted: {reason}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_status(config: &AppConfig, report: &StatusReport) {
    println!("Data directory: {}", config.data_dir.display());

    let metadata = &report.metadata;
    match metadata.last_sync_date {
        Some(at) => println!(
            "Last sync: {} ({})",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            metadata
                .last_mode
                .map(|mode| mode.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ),
        None => println!("Last sync: never"),
    }
    if let Some(range) = &metadata.date_range {
        println!("Symbol history: {} .. {}", range.start(), range.end());
    }
    if let Some(range) = &metadata.partition_range {
        println!("Date partitions: {} .. {}", range.start(), range.end());
    }

    let storage = &report.storage;
    println!(
        "Stored: {} symbols, {} date partitions, {} files, {}",
        storage.symbols,
        storage.date_partitions,
        storage.files,
        human_bytes(storage.bytes)
    );

    if report.checkpoints.is_empty() {
        println!("Checkpoint: none");
    }
    for progress in &report.checkpoints {
        println!(
            "Checkpoint: {} {} run started {}, {} symbols and {} dates done, {} failed",
            progress.status,
            progress.mode,
            progress.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            progress.completed,
            progress.completed_dates,
            progress.failed
        );
        if let Some(error) = &progress.last_error {
            println!("  Last error: {error}");
        }
    }

    match &report.active_sync {
        Some(lock) => println!(
            "Active sync: pid {} since {}",
            lock.pid,
            lock.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("Active sync: none"),
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
