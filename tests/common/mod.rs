//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires an in-memory broker and a recording
//! telemetry sink into an [`AppContext`], plus stub implementations of the
//! public traits for failure injection.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use transcodeflow::broker::{Broker, MemoryBroker, SharedBroker};
use transcodeflow::config::ServerConfig;
use transcodeflow::server::{create_router, AppContext};
use transcodeflow::telemetry::RecordingTelemetry;
use transcodeflow::worker::{ErrorHandler, WorkerError};
use transcodeflow_core::{Error, Result};

/// Test harness wrapping an [`AppContext`] backed by a [`MemoryBroker`].
pub struct TestHarness {
    pub broker: Arc<MemoryBroker>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub ctx: AppContext,
}

impl TestHarness {
    pub fn new() -> Self {
        let broker = Arc::new(MemoryBroker::new(Duration::from_millis(50)));
        Self::with_broker(broker.clone(), broker)
    }

    /// Serve requests through `serving`, while `broker` stays inspectable.
    pub fn with_broker(broker: Arc<MemoryBroker>, serving: SharedBroker) -> Self {
        let telemetry = Arc::new(RecordingTelemetry::new());
        let ctx = AppContext::new(serving, telemetry.clone(), &ServerConfig::default());
        Self {
            broker,
            telemetry,
            ctx,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }
}

/// Broker whose every call fails.
#[derive(Default)]
pub struct FailingBroker {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Broker for FailingBroker {
    async fn enqueue_job(&self, _payload: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::broker("connection refused"))
    }

    async fn dequeue_job(&self, _cancel: &CancellationToken) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::broker("connection refused"))
    }

    async fn enqueue_job_result(&self, _payload: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::broker("connection refused"))
    }
}

/// Broker whose enqueue never finishes.
pub struct StalledBroker;

#[async_trait]
impl Broker for StalledBroker {
    async fn enqueue_job(&self, _payload: &str) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn dequeue_job(&self, _cancel: &CancellationToken) -> Result<Option<String>> {
        Ok(None)
    }

    async fn enqueue_job_result(&self, _payload: &str) -> Result<()> {
        Ok(())
    }
}

/// Delegates to a [`MemoryBroker`], failing the first `failures` dequeues.
pub struct FlakyBroker {
    pub inner: Arc<MemoryBroker>,
    failures: AtomicUsize,
}

impl FlakyBroker {
    pub fn new(inner: Arc<MemoryBroker>, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl Broker for FlakyBroker {
    async fn enqueue_job(&self, payload: &str) -> Result<()> {
        self.inner.enqueue_job(payload).await
    }

    async fn dequeue_job(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        let remaining = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            return Err(Error::broker("connection reset"));
        }
        self.inner.dequeue_job(cancel).await
    }

    async fn enqueue_job_result(&self, payload: &str) -> Result<()> {
        self.inner.enqueue_job_result(payload).await
    }
}

/// Keeps every reported error.
#[derive(Default)]
pub struct CollectingErrorHandler {
    errors: Mutex<Vec<WorkerError>>,
}

impl CollectingErrorHandler {
    pub fn errors(&self) -> Vec<WorkerError> {
        self.errors.lock().clone()
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn handle_error(&self, err: &WorkerError) {
        self.errors.lock().push(err.clone());
    }
}

/// Minimal valid job payload.
pub fn job_json(input: &str, output: &str) -> String {
    serde_json::json!({
        "input_file_path": input,
        "output_file_path": output,
    })
    .to_string()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
