mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./transcodeflow.toml",
        "~/.config/transcodeflow/config.toml",
        "/etc/transcodeflow/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Load from file (or defaults), apply overrides, then validate.
pub fn resolve_config(custom_path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let mut config = load_config_or_default(custom_path)?;
    config.apply(overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.worker.max_parallelization == 0 {
        anyhow::bail!("max_parallelization must be at least 1");
    }

    if config.server.enqueue_timeout_secs == 0 {
        anyhow::bail!("server.enqueue_timeout_secs must be at least 1");
    }

    if config.broker.dequeue_timeout_secs == 0 {
        anyhow::bail!("broker.dequeue_timeout_secs must be at least 1");
    }

    if config.broker.url.is_empty() {
        anyhow::bail!("Broker URL cannot be empty");
    }

    if config.broker.job_queue == config.broker.result_queue {
        anyhow::bail!(
            "Job queue and result queue must differ (both are '{}')",
            config.broker.job_queue
        );
    }

    if config.metrics.enabled && config.mode == Mode::Server && config.metrics.port == config.server.port {
        anyhow::bail!("Metrics port {} collides with the server port", config.metrics.port);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Server);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.broker.job_queue, "jobs");
        assert_eq!(config.broker.result_queue, "results");
        assert_eq!(config.broker.dequeue_timeout_secs, 30);
        assert!(config.worker.max_parallelization >= 1);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
mode = "worker"

[broker]
url = "redis://localhost:6379"

[worker]
max_parallelization = 3
hardware_device = "qsv=hw"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.mode, Mode::Worker);
        assert_eq!(config.broker.url, "redis://localhost:6379");
        assert_eq!(config.broker.job_queue, "jobs");
        assert_eq!(config.worker.max_parallelization, 3);
        assert_eq!(config.worker.hardware_device.as_deref(), Some("qsv=hw"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_rejects_unknown_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"scheduler\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply(Overrides {
            mode: Some(Mode::Worker),
            port: Some(9000),
            broker_url: Some("memory://".into()),
            max_parallelization: Some(7),
            hardware_device: Some(String::new()),
            ..Default::default()
        });

        assert_eq!(config.mode, Mode::Worker);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.broker.url, "memory://");
        assert_eq!(config.worker.max_parallelization, 7);
        assert_eq!(config.worker.hardware_device, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.worker.max_parallelization = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.broker.result_queue = "jobs".into();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.metrics.port = config.server.port;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.broker.dequeue_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.enqueue_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("server".parse::<Mode>().unwrap(), Mode::Server);
        assert_eq!("API".parse::<Mode>().unwrap(), Mode::Server);
        assert_eq!("Worker".parse::<Mode>().unwrap(), Mode::Worker);
        assert_eq!("".parse::<Mode>().unwrap(), Mode::Server);
        assert!("batch".parse::<Mode>().is_err());
    }
}
