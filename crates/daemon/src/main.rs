//! log-triage: watch a log file and turn error blocks into deduplicated issues.
//!
//! Usage:
//!   log-triage --log-file /var/log/api.log
//!   log-triage --config triage.toml --once

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log_triage_core::{IssueStore, LogMonitor, MemoryIssueStore, MonitorConfig, TicketGenerator};
use log_triage_db::Database;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "log-triage", version)]
#[command(about = "Tail a log file and reconcile error blocks into issues")]
struct Args {
    /// TOML config file. Environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file to watch (overrides LOG_FILE_PATH)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Poll interval in seconds (overrides POLL_INTERVAL_SECS)
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Keep issues in memory instead of the SQLite database
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = MonitorConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(log_file) = args.log_file {
        config.log_file = log_file;
    }
    if let Some(interval) = args.interval {
        config.poll_interval_secs = interval;
    }
    config.validate()?;

    let store: Arc<dyn IssueStore> = if args.memory_store {
        info!("Using in-memory issue store");
        Arc::new(MemoryIssueStore::new())
    } else {
        let db = match config.resolved_database_path() {
            Some(path) => Database::new(&path).await,
            None => Database::open_default().await,
        }
        .context("opening issue database")?;
        Arc::new(db)
    };

    let mut monitor = LogMonitor::from_config(&config, store)
        .await
        .context("opening audit file")?;

    let totals = if args.once {
        monitor.poll_once().await
    } else {
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Interrupt received, stopping after the current cycle"),
                    Err(e) => {
                        warn!(error = %e, "Failed to listen for ctrl-c");
                        return;
                    }
                }
                cancel.cancel();
            }
        });
        monitor.run(config.poll_interval(), cancel).await
    };

    info!(
        lines = totals.lines_read,
        errors = totals.errors_found,
        created = totals.issues_created,
        updated = totals.issues_updated,
        line_failures = totals.line_failures,
        persist_failures = totals.persist_failures,
        audit_failures = totals.audit_failures,
        generator_fallbacks = totals.generator_fallbacks,
        read_failures = totals.read_failures,
        "Totals"
    );
    if let TicketGenerator::ModelBacked(generator) = monitor.generator() {
        info!(tokens = generator.token_usage(), "LLM token usage");
    }
    Ok(())
}
