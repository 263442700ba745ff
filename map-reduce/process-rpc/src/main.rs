// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use page_map_reduce_core::collaborators::{Collaborators, PageTransform};
use page_map_reduce_core::config::{CoordinatorConfig, WorkerConfig};
use page_map_reduce_core::coordinator::Coordinator;
use page_map_reduce_core::output_layout::OutputLayout;
use page_map_reduce_core::worker::Worker;
use page_map_reduce_rpc::logging::log_filter;
use page_map_reduce_rpc::{start_coordinator_server, GrpcCoordinatorClient};
use page_map_reduce_text::{CommandTransform, PassthroughTransform, TextAssembler, TextPageSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Per-page map-reduce over paginated text documents")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track the job and hand out tasks to polling workers
    Coordinator(CoordinatorArgs),
    /// Poll the coordinator and execute map and reduce tasks
    Worker(WorkerArgs),
}

#[derive(Args)]
struct CoordinatorArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to serve polls on
    #[arg(long, env = "MR_LISTEN_ADDR")]
    listen: Option<String>,

    /// Lease duration in milliseconds
    #[arg(long)]
    lease_ms: Option<u64>,

    /// Input documents, in assignment order
    documents: Vec<String>,
}

#[derive(Args)]
struct WorkerArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Coordinator address (host:port)
    #[arg(long, env = "MR_COORD_ENDPOINT")]
    coordinator: Option<String>,

    /// Directory shared with the other workers for page outputs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Name used in logs
    #[arg(long)]
    id: Option<String>,

    /// Page transform program and its arguments; pages pass through unchanged if omitted
    #[arg(last = true)]
    transform_cmd: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Coordinator(args) => run_coordinator(args).await,
        Command::Worker(args) => run_worker(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(rust_log.as_deref(), verbose)
        .with_context(|| format!("invalid {}", EnvFilter::DEFAULT_ENV))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

fn coordinator_config(args: CoordinatorArgs) -> Result<CoordinatorConfig> {
    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::load(path)?,
        None => CoordinatorConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(lease_ms) = args.lease_ms {
        config.lease_ms = lease_ms;
    }
    if !args.documents.is_empty() {
        config.documents = args.documents;
    }
    config.validate()?;
    Ok(config)
}

fn worker_config(args: &WorkerArgs) -> Result<WorkerConfig> {
    let mut config = match &args.config {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::default(),
    };
    if let Some(coordinator) = &args.coordinator {
        config.coordinator_addr = coordinator.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if !args.transform_cmd.is_empty() {
        config.transform_command = Some(args.transform_cmd.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run_coordinator(args: CoordinatorArgs) -> Result<()> {
    let config = coordinator_config(args)?;
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address '{}'", config.listen_addr))?;

    let coordinator = Arc::new(
        Coordinator::discover(config.documents.clone(), &TextPageSource, config.lease()).await?,
    );
    let server = start_coordinator_server(Arc::clone(&coordinator), addr).await?;

    let mut ticker = tokio::time::interval(config.progress_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let progress = coordinator.progress();
                info!(
                    map_idle = progress.map.idle,
                    map_assigned = progress.map.assigned,
                    map_done = progress.map.done,
                    reduce_idle = progress.reduce.idle,
                    reduce_assigned = progress.reduce.assigned,
                    reduce_done = progress.reduce.done,
                    expired_leases = progress.expired_leases,
                    "progress"
                );
                if coordinator.job_done() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted before the job finished");
                server.shutdown().await?;
                bail!("coordinator interrupted");
            }
        }
    }

    // Keep answering for a while so polling workers learn they can exit
    let grace = config.exit_grace();
    info!(grace_ms = grace.as_millis() as u64, "job done");
    tokio::select! {
        _ = tokio::time::sleep(grace) => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    server.shutdown().await?;
    Ok(())
}

async fn run_worker(args: WorkerArgs) -> Result<()> {
    let config = worker_config(&args)?;
    let id = args
        .id
        .unwrap_or_else(|| format!("worker-{}", std::process::id()));

    let client = GrpcCoordinatorClient::new(config.coordinator_addr.clone());
    client
        .connect(
            config.connect_attempts,
            Duration::from_millis(config.retry_base_ms),
        )
        .await
        .context("coordinator unreachable at startup")?;

    let transform: Arc<dyn PageTransform> = match config
        .transform_command
        .as_deref()
        .and_then(|command| CommandTransform::from_command_line(command, config.transform_timeout()))
    {
        Some(command) => Arc::new(command),
        None => Arc::new(PassthroughTransform),
    };
    let layout = OutputLayout::new(config.output_dir.clone());
    let collaborators = Collaborators::new(
        Arc::new(TextPageSource),
        transform,
        Arc::new(TextAssembler::new(layout.clone())),
    );

    let worker = Worker::new(id, client, collaborators, layout, config);
    let cancel = worker.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    worker.run().await?;
    Ok(())
}
