//! Metrics and structured events.
//!
//! Components never touch a global recorder directly. They receive a
//! [`Telemetry`] handle at construction and report through it, so tests can
//! swap in [`RecordingTelemetry`] and assert on what was reported.

mod prometheus;
mod recording;

pub use prometheus::PrometheusTelemetry;
pub use recording::RecordingTelemetry;

use std::sync::Arc;
use std::time::Duration;

use transcodeflow_core::QualityPreset;

/// Shared handle passed to the server and the worker pool.
pub type SharedTelemetry = Arc<dyn Telemetry>;

/// Counters reported by this crate. Each carries exactly one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Submission outcomes, labelled `status=success|failed`.
    ServerRequests,
    /// Jobs pushed onto the job queue, labelled `submitted=job_pushed`.
    TranscodingJobs,
    /// Jobs processed by the pool, labelled `outcome=success|failed`.
    WorkerJobs,
    /// Worker-side faults, labelled `stage=dequeue|decode|execute|publish`.
    WorkerErrors,
}

impl Counter {
    pub fn name(&self) -> &'static str {
        match self {
            Counter::ServerRequests => "server_request_total",
            Counter::TranscodingJobs => "transcoding_jobs_total",
            Counter::WorkerJobs => "worker_jobs_total",
            Counter::WorkerErrors => "worker_errors_total",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Counter::ServerRequests => "status",
            Counter::TranscodingJobs => "submitted",
            Counter::WorkerJobs => "outcome",
            Counter::WorkerErrors => "stage",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Counter::ServerRequests => "Submission requests by outcome",
            Counter::TranscodingJobs => "Jobs pushed onto the job queue",
            Counter::WorkerJobs => "Jobs processed by the worker pool",
            Counter::WorkerErrors => "Worker faults by failing stage",
        }
    }

    pub const ALL: [Counter; 4] = [
        Counter::ServerRequests,
        Counter::TranscodingJobs,
        Counter::WorkerJobs,
        Counter::WorkerErrors,
    ];
}

/// Name of the gauge tracking in-flight worker tasks.
pub const WORKER_IN_FLIGHT: &str = "worker_in_flight";

/// Structured events worth a log line and, for some sinks, a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    JobSubmitted {
        input: String,
        output: String,
        preset: QualityPreset,
        advanced: bool,
        hardware_acceleration: bool,
        dry_run: bool,
    },
    JobCompleted {
        input: String,
        output: String,
        success: bool,
        elapsed: Duration,
    },
    WorkerFault {
        stage: &'static str,
        error: String,
    },
}

/// Injected metrics and event sink. Every call is fire-and-forget.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: &Event);

    fn increment(&self, counter: Counter, label: &str);

    fn set_in_flight(&self, _count: usize) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _event: &Event) {}

    fn increment(&self, _counter: Counter, _label: &str) {}
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter depends on `verbose`.
pub fn init_tracing(verbose: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "transcodeflow=trace,transcodeflow_core=trace,tower_http=debug".to_string()
        } else {
            "transcodeflow=debug,transcodeflow_core=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_names_are_distinct() {
        let mut names: Vec<_> = Counter::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Counter::ALL.len());
        assert_eq!(Counter::ServerRequests.label_key(), "status");
        assert_eq!(Counter::TranscodingJobs.name(), "transcoding_jobs_total");
    }

    #[test]
    fn noop_accepts_everything() {
        let telemetry: SharedTelemetry = Arc::new(NoopTelemetry);
        telemetry.increment(Counter::WorkerJobs, "success");
        telemetry.set_in_flight(3);
        telemetry.record(&Event::WorkerFault {
            stage: "decode",
            error: "bad json".into(),
        });
    }
}
