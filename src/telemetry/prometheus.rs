use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use super::{Counter, Event, Telemetry, WORKER_IN_FLIGHT};

/// Forwards counters to the `metrics` facade and events to `tracing`.
///
/// Whether anything scrapes the counters depends on a recorder being
/// installed, see [`PrometheusTelemetry::install`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusTelemetry;

impl PrometheusTelemetry {
    /// Install the Prometheus recorder and serve `/metrics` on `addr`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install(addr: SocketAddr) -> anyhow::Result<Self> {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

        for counter in Counter::ALL {
            metrics::describe_counter!(counter.name(), counter.help());
        }
        metrics::describe_gauge!(WORKER_IN_FLIGHT, "Worker tasks currently holding a slot");

        tracing::info!("Serving Prometheus metrics on http://{}/metrics", addr);
        Ok(Self)
    }
}

impl Telemetry for PrometheusTelemetry {
    fn record(&self, event: &Event) {
        match event {
            Event::JobSubmitted {
                input,
                output,
                preset,
                advanced,
                hardware_acceleration,
                dry_run,
            } => {
                tracing::info!(
                    input = %input,
                    output = %output,
                    preset = %preset,
                    advanced,
                    hardware_acceleration,
                    dry_run,
                    "Job submitted"
                );
            }
            Event::JobCompleted {
                input,
                output,
                success,
                elapsed,
            } => {
                tracing::info!(
                    input = %input,
                    output = %output,
                    success,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Job completed"
                );
            }
            Event::WorkerFault { stage, error } => {
                tracing::warn!(stage, error = %error, "Worker fault");
            }
        }
    }

    fn increment(&self, counter: Counter, label: &str) {
        metrics::counter!(counter.name(), counter.label_key() => label.to_string()).increment(1);
    }

    fn set_in_flight(&self, count: usize) {
        metrics::gauge!(WORKER_IN_FLIGHT).set(count as f64);
    }
}
