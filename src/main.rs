//! Sitegauge command-line interface
//!
//! Thin wrapper over the audit service: one-shot page/site audits (submit,
//! drain the queue inline, print the report), a long-running worker mode,
//! and job status/result queries against the shared store.

use anyhow::{bail, Context};
use clap::Parser;
use sitegauge::cache::ArtifactKind;
use sitegauge::config::{load_config_with_hash, Config};
use sitegauge::jobs::Worker;
use sitegauge::store::{SharedStore, SqliteStore};
use sitegauge::{AuditService, SubmitOutcome};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Sitegauge: an asynchronous SEO audit pipeline
#[derive(Parser, Debug)]
#[command(name = "sitegauge")]
#[command(version)]
#[command(about = "Audit web pages and sites for SEO quality", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Audit a single page and print the report
    #[arg(long, value_name = "URL", conflicts_with_all = ["site", "worker", "status", "results"])]
    page: Option<String>,

    /// Audit a whole site and print the report
    #[arg(long, value_name = "URL", conflicts_with_all = ["worker", "status", "results"])]
    site: Option<String>,

    /// Run the long-lived worker loop against the configured store
    #[arg(long, conflicts_with_all = ["status", "results"])]
    worker: bool,

    /// Print a job's status (minus result payload) and exit
    #[arg(long, value_name = "JOB_ID", conflicts_with = "results")]
    status: Option<Uuid>,

    /// Print a completed job's results and exit
    #[arg(long, value_name = "JOB_ID")]
    results: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = Arc::new(load_configuration(cli.config.as_deref())?);

    if let Some(url) = &cli.page {
        run_one_shot(url, ArtifactKind::PageAudit, config).await
    } else if let Some(url) = &cli.site {
        run_one_shot(url, ArtifactKind::SiteAudit, config).await
    } else if cli.worker {
        run_worker(config).await
    } else if let Some(id) = cli.status {
        let service = open_service(&config)?;
        print_json(&service.job_status(&id)?)
    } else if let Some(id) = cli.results {
        let service = open_service(&config)?;
        print_json(&service.job_results(&id)?)
    } else {
        bail!("Nothing to do; pass --page, --site, --worker, --status, or --results");
    }
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegauge=info,warn"),
            1 => EnvFilter::new("sitegauge=debug,info"),
            2 => EnvFilter::new("sitegauge=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded from {} (hash {})", path.display(), hash);
            Ok(config)
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// Opens the configured durable store
fn open_service(config: &Arc<Config>) -> anyhow::Result<AuditService> {
    let store: SharedStore = Arc::new(Mutex::new(
        SqliteStore::new(Path::new(&config.store.database_path))
            .context("failed to open store")?,
    ));
    Ok(AuditService::new(store, Arc::clone(config)))
}

/// Submits one audit, drains the queue inline, and prints the report
///
/// One-shot audits run against an in-memory store: nothing persists beyond
/// the printed report.
async fn run_one_shot(url: &str, kind: ArtifactKind, config: Arc<Config>) -> anyhow::Result<()> {
    let store: SharedStore = Arc::new(Mutex::new(SqliteStore::new_in_memory()?));
    let service = AuditService::new(Arc::clone(&store), Arc::clone(&config));
    let worker = Worker::new(store, config)?;

    match service.submit(url, kind, None)? {
        SubmitOutcome::Cached(artifact) => print_json(&artifact),
        SubmitOutcome::Busy => bail!("queue is full"),
        SubmitOutcome::Enqueued(id) => {
            worker.run_batch(1).await?;
            print_json(&service.job_results(&id)?)
        }
    }
}

/// Runs the worker loop until Ctrl+C
async fn run_worker(config: Arc<Config>) -> anyhow::Result<()> {
    let store: SharedStore = Arc::new(Mutex::new(
        SqliteStore::new(Path::new(&config.store.database_path))
            .context("failed to open store")?,
    ));
    let worker = Worker::new(store, config)?;

    let shutdown = worker.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    worker.run().await;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
