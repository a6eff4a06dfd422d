//! gcp-reaper: tear down every billable resource in a GCP project
//!
//! Resolves credentials and locations, assembles the resource-kind registry,
//! and hands control to the orchestrator in `gcp-reaper-core`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gcp_reaper::gcp::{ComputeInstances, GcpContext, SqlInstances, discover_regions, discover_zones};
use gcp_reaper_core::config::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use gcp_reaper_core::orchestrator::orchestrate;
use gcp_reaper_core::{Registry, RunConfig, RunError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gcp-reaper")]
#[command(about = "Shut down every billable resource in a GCP project")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shut down all resources in a project
    Stop(StopArgs),
}

#[derive(clap::Args, Debug)]
struct StopArgs {
    /// GCP project id to shut down
    #[arg(short, long)]
    project: String,

    /// Report what would be shut down without mutating anything
    #[arg(short = 'd', long)]
    dryrun: bool,

    /// Timeout for shutdown of a single resource in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Interval between shutdown status polls in seconds
    #[arg(short = 'o', long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    polltime: u64,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        print_error(&err);
        std::process::exit(1);
    }
}

/// Print the error and its cause chain to stderr.
fn print_error(err: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {err}");

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Stop(stop) => stop_project(stop).await,
    }
}

async fn stop_project(args: StopArgs) -> Result<()> {
    let ctx = GcpContext::new()
        .await
        .context("failed to set up GCP credentials")?;

    let zones = discover_zones(&ctx, &args.project)
        .await
        .map_err(|err| RunError::Setup(format!("listing zones for {}: {err}", args.project)))?;
    let regions = discover_regions(&ctx, &args.project)
        .await
        .map_err(|err| RunError::Setup(format!("listing regions for {}: {err}", args.project)))?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    let config = Arc::new(RunConfig {
        project: args.project,
        dry_run: args.dryrun,
        timeout: Duration::from_secs(args.timeout),
        poll_interval: Duration::from_secs(args.polltime),
        cancel,
        zones,
        regions,
    });

    info!(
        project = %config.project,
        timeout_secs = args.timeout,
        polltime_secs = args.polltime,
        dry_run = config.dry_run,
        zones = config.zones.len(),
        "starting shutdown run"
    );

    let mut registry = Registry::new();
    registry.register(Box::new(ComputeInstances::new(ctx.clone())))?;
    registry.register(Box::new(SqlInstances::new(ctx)))?;
    registry.setup_all(config.clone());

    orchestrate(&registry, &config).await?;

    info!(project = %config.project, "run complete");
    Ok(())
}
