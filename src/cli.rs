use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use transcodeflow::config::{Mode, Overrides};

#[derive(Parser)]
#[command(name = "transcodeflow")]
#[command(author, version, about = "Transcoding job queue: submission endpoint and worker pool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "TRANSCODEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Settings that win over the config file.
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Component set to run: server (alias api) or worker
    #[arg(long, global = true, env = "APP_MODE")]
    pub mode: Option<Mode>,

    /// Port for the submission endpoint
    #[arg(short, long, global = true, env = "PORT")]
    pub port: Option<u16>,

    /// Broker URL (redis://host:port or memory://)
    #[arg(long, global = true, env = "BROKER_URL")]
    pub broker_url: Option<String>,

    /// Maximum number of jobs a worker runs at once
    #[arg(long, global = true, env = "MAX_PARALLELIZATION")]
    pub max_parallelization: Option<usize>,

    /// ffmpeg binary used by the worker
    #[arg(long, global = true, env = "FFMPEG_PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Device passed to -init_hw_device for jobs that name none
    #[arg(long, global = true, env = "HARDWARE_DEVICE")]
    pub hardware_device: Option<String>,

    /// Port for the Prometheus exporter
    #[arg(long, global = true, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            mode: args.mode,
            port: args.port,
            broker_url: args.broker_url,
            max_parallelization: args.max_parallelization,
            ffmpeg_path: args.ffmpeg_path,
            hardware_device: args.hardware_device,
            metrics_port: args.metrics_port,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the configured mode (the default)
    Run,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Print the ffmpeg command a job file would run
    Command {
        /// JSON job file, as it would be submitted
        #[arg(required = true)]
        job: PathBuf,
    },

    /// Display version information
    Version,
}
