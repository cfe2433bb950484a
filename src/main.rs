//! Tidepool - Entry Point
//!
//! Binds the event socket on a Tokio runtime, then runs the fixed-rate
//! simulation on the main thread until the viewer quits, Ctrl-C arrives,
//! or a bounded headless run finishes.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tidepool::core::config::SOCKET_ENV_VAR;
use tidepool::core::{Result, ShutdownSignal, SystemClock, TidepoolConfig};
use tidepool::ingest::{DemoSpawner, IngestCounters, IngestServer, TransferQueue};
use tidepool::render::{HeadlessRenderer, TerminalRenderer, ViewerCommand};
use tidepool::simulation::{Simulation, TickDriver};

/// Seconds between headless snapshot summaries
const HEADLESS_SUMMARY_SECS: f64 = 5.0;

/// Tidepool - watch agents work in a terminal aquarium
#[derive(Parser, Debug)]
#[command(name = "tidepool")]
#[command(about = "Terminal aquarium that animates live agent activity streamed over a local socket")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Event socket path (overrides TIDEPOOL_SOCK and the config file)
    #[arg(long)]
    sock: Option<PathBuf>,

    /// Ticks per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Transfer queue capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Spawn synthetic agents every few seconds
    #[arg(long)]
    demo: bool,

    /// Run without a terminal UI, logging snapshot summaries to stderr
    #[arg(long)]
    headless: bool,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Log file used while the terminal UI is active
    #[arg(long, default_value = "tidepool.log")]
    log_file: PathBuf,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,
}

fn build_config(cli: &Cli) -> Result<TidepoolConfig> {
    let mut config = match &cli.config {
        Some(path) => TidepoolConfig::load(path)?,
        None => TidepoolConfig::new(),
    };

    if let Some(path) = std::env::var_os(SOCKET_ENV_VAR) {
        config.ingest.socket_path = PathBuf::from(path);
    }
    if let Some(path) = &cli.sock {
        config.ingest.socket_path = path.clone();
    }
    if let Some(rate) = cli.tick_rate {
        config.simulation.tick_rate_hz = rate;
    }
    if let Some(capacity) = cli.queue_capacity {
        config.ingest.queue_capacity = capacity;
    }
    if cli.seed.is_some() {
        config.simulation.rng_seed = cli.seed;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidepool=info"));
    if cli.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = OpenOptions::new().create(true).append(true).open(&cli.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_tracing(&cli)?;

    info!(
        socket = ?config.ingest.socket_path,
        tick_rate_hz = config.simulation.tick_rate_hz,
        queue_capacity = config.ingest.queue_capacity,
        demo = cli.demo,
        headless = cli.headless,
        "Tidepool starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tidepool-io")
        .build()?;
    let shutdown = ShutdownSignal::new();
    let queue = Arc::new(TransferQueue::new(config.ingest.queue_capacity));
    let counters = Arc::new(IngestCounters::default());

    let server = {
        let _guard = runtime.enter();
        IngestServer::bind(&config.ingest, Arc::clone(&queue), Arc::clone(&counters)).map_err(|err| {
            error!(%err, "Cannot open event socket");
            err
        })?
    };
    let server_task = runtime.spawn(server.serve(shutdown.clone()));

    let signal_shutdown = shutdown.clone();
    runtime.spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Ctrl-C received");
                    signal_shutdown.trigger();
                }
                Err(err) => warn!(%err, "Cannot listen for Ctrl-C"),
            },
            _ = signal_shutdown.wait() => {}
        }
    });

    let demo = DemoSpawner::new(Arc::clone(&queue), runtime.handle().clone(), shutdown.clone(), cli.seed);
    if cli.demo {
        demo.start_background();
    }

    let simulation = Simulation::new(
        config.simulation.clone(),
        config.environment.clone(),
        Box::new(SystemClock),
    );
    let mut driver = TickDriver::new(simulation, queue, counters, shutdown.clone());
    if let Some(ticks) = cli.ticks {
        driver = driver.with_max_ticks(ticks);
    }
    let on_command = |command: ViewerCommand| {
        if command == ViewerCommand::SpawnDemoAgent {
            let agent_id = demo.spawn_agent();
            info!(agent_id = %agent_id, "Demo agent requested");
        }
    };

    let outcome = if cli.headless {
        let every = (config.simulation.tick_rate_hz * HEADLESS_SUMMARY_SECS).round().max(1.0) as u64;
        driver.run(&mut HeadlessRenderer::new(every), on_command)
    } else {
        // The renderer restores the terminal when it goes out of scope
        TerminalRenderer::new().and_then(|mut renderer| driver.run(&mut renderer, on_command))
    };

    shutdown.trigger();
    match runtime.block_on(server_task) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(%err, "Ingestion server failed"),
        Err(err) => error!(%err, "Ingestion task failed"),
    }
    runtime.shutdown_timeout(Duration::from_millis(config.ingest.shutdown_grace_ms));

    match outcome {
        Ok(summary) => {
            info!(ticks = summary.ticks, "Tidepool stopped");
            Ok(())
        }
        Err(err) => {
            error!(%err, "Tidepool stopped on error");
            Err(err)
        }
    }
}
