mod cli;

use transcodeflow::{
    broker,
    config::{self, Mode, Overrides},
    server::{self, AppContext},
    shutdown,
    telemetry::{self, NoopTelemetry, PrometheusTelemetry, SharedTelemetry},
    worker::{FfmpegTranscoder, WorkerPool},
};
use transcodeflow_core::Job;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn run(config_path: Option<&Path>, overrides: Overrides) -> Result<()> {
    let config = config::resolve_config(config_path, overrides)?;

    tracing::info!(mode = %config.mode, broker = %config.broker.url, "Starting transcodeflow");

    let cancel = CancellationToken::new();
    shutdown::cancel_on_signal(cancel.clone());

    let telemetry: SharedTelemetry = if config.metrics.enabled {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.metrics.port)
            .parse()
            .context("Invalid metrics address")?;
        Arc::new(PrometheusTelemetry::install(addr)?)
    } else {
        Arc::new(NoopTelemetry)
    };

    // The only fatal runtime error: no broker at startup.
    let broker = broker::connect(&config.broker)
        .await
        .with_context(|| format!("Failed to connect to broker at {}", config.broker.url))?;

    match config.mode {
        Mode::Server => {
            let ctx = AppContext::new(broker, telemetry, &config.server);
            server::start_server(&config.server, ctx, cancel).await
        }
        Mode::Worker => {
            let transcoder = FfmpegTranscoder::from_config(&config.worker);
            tracing::info!(
                ffmpeg = %transcoder.program().display(),
                hardware_device = config.worker.hardware_device.as_deref().unwrap_or("none"),
                "Using transcoder"
            );

            let pool = WorkerPool::new(
                broker,
                Arc::new(transcoder),
                config.worker.max_parallelization,
            )
            .with_telemetry(telemetry)
            .with_error_backoff(config.worker.error_backoff());

            pool.start(cancel).await;
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose);

    let overrides = Overrides::from(cli.overrides);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(cli.config.as_deref(), overrides))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref(), overrides)
        }
        Commands::Command { job } => print_command(&job, cli.config.as_deref(), overrides),
        Commands::Version => {
            println!("transcodeflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>, overrides: Overrides) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, using defaults"),
    }

    let config = config::resolve_config(path, overrides)?;

    println!("✓ Configuration is valid");
    println!("  Mode: {}", config.mode);
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Broker: {} (jobs: {}, results: {})",
        config.broker.url, config.broker.job_queue, config.broker.result_queue
    );
    println!(
        "  Worker: {} parallel, ffmpeg {:?}",
        config.worker.max_parallelization, config.worker.ffmpeg_path
    );
    if let Some(ref device) = config.worker.hardware_device {
        println!("  Hardware device: {}", device);
    }
    if config.metrics.enabled {
        println!("  Metrics: port {}", config.metrics.port);
    } else {
        println!("  Metrics: disabled");
    }

    Ok(())
}

fn print_command(job_path: &Path, config_path: Option<&Path>, overrides: Overrides) -> Result<()> {
    let config = config::resolve_config(config_path, overrides)?;

    let content = std::fs::read(job_path)
        .with_context(|| format!("Failed to read job file: {:?}", job_path))?;
    let job = Job::from_json(&content)
        .with_context(|| format!("Failed to parse job file: {:?}", job_path))?;
    job.validate()?;

    if let Some(opts) = &job.simple_options {
        println!(
            "# preset {}: {}",
            opts.quality_preset,
            opts.quality_preset.description()
        );
    }

    let transcoder = FfmpegTranscoder::from_config(&config.worker);
    println!("{}", transcoder.command_line(job));

    Ok(())
}
