use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Which component set this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// HTTP submission endpoint.
    #[default]
    Server,
    /// Worker pool consuming the job queue.
    Worker,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "server" | "api" => Ok(Mode::Server),
            "worker" => Ok(Mode::Worker),
            other => Err(format!("unknown mode '{}' (expected server or worker)", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Server => f.write_str("server"),
            Mode::Worker => f.write_str("worker"),
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on a single broker enqueue during submission. Must be at least 1.
    #[serde(default = "default_enqueue_timeout")]
    pub enqueue_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_enqueue_timeout() -> u64 {
    5
}

impl ServerConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_secs(self.enqueue_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enqueue_timeout_secs: default_enqueue_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// `redis://host:port`, `rediss://...`, or `memory://`.
    #[serde(default = "default_broker_url")]
    pub url: String,

    #[serde(default = "default_job_queue")]
    pub job_queue: String,

    #[serde(default = "default_result_queue")]
    pub result_queue: String,

    /// How long a blocking dequeue waits before reporting an empty queue.
    /// Must be at least 1; Redis treats a zero `BRPOP` timeout as "forever".
    #[serde(default = "default_dequeue_timeout")]
    pub dequeue_timeout_secs: u64,
}

fn default_broker_url() -> String {
    "redis://redis:6379".to_string()
}
fn default_job_queue() -> String {
    "jobs".to_string()
}
fn default_result_queue() -> String {
    "results".to_string()
}
fn default_dequeue_timeout() -> u64 {
    30
}

impl BrokerConfig {
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_secs(self.dequeue_timeout_secs)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            job_queue: default_job_queue(),
            result_queue: default_result_queue(),
            dequeue_timeout_secs: default_dequeue_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Maximum number of jobs processed concurrently.
    #[serde(default = "default_max_parallelization")]
    pub max_parallelization: usize,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Device spec passed to `-init_hw_device` for jobs that carry none.
    #[serde(default)]
    pub hardware_device: Option<String>,

    /// Delay before replacing a slot whose broker call failed.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,
}

fn default_max_parallelization() -> usize {
    num_cpus::get().max(1)
}
fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}
fn default_error_backoff() -> u64 {
    1000
}

impl WorkerConfig {
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_parallelization: default_max_parallelization(),
            ffmpeg_path: default_ffmpeg_path(),
            hardware_device: None,
            error_backoff_ms: default_error_backoff(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics on `port`.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

/// Values taken from the command line or environment, applied over the file config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<Mode>,
    pub port: Option<u16>,
    pub broker_url: Option<String>,
    pub max_parallelization: Option<usize>,
    pub ffmpeg_path: Option<PathBuf>,
    pub hardware_device: Option<String>,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(url) = overrides.broker_url {
            self.broker.url = url;
        }
        if let Some(max) = overrides.max_parallelization {
            self.worker.max_parallelization = max;
        }
        if let Some(path) = overrides.ffmpeg_path {
            self.worker.ffmpeg_path = path;
        }
        if let Some(device) = overrides.hardware_device {
            self.worker.hardware_device = Some(device).filter(|d| !d.is_empty());
        }
        if let Some(port) = overrides.metrics_port {
            self.metrics.port = port;
        }
    }
}
