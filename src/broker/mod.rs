//! Work queue and result queue.
//!
//! The [`Broker`] trait is the only thing the server and the worker pool know
//! about the queue backend. Payloads are opaque JSON strings; encoding and
//! decoding jobs is the caller's business.

mod memory;
mod redis;

pub use self::memory::MemoryBroker;
pub use self::redis::RedisBroker;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use transcodeflow_core::{Error, Result};

use crate::config::BrokerConfig;

/// Blocking-pop job queue plus a result queue.
///
/// Implementations must be safe to call concurrently from many tasks.
/// Each dequeued payload is handed to exactly one caller.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append a serialized job to the job queue.
    async fn enqueue_job(&self, payload: &str) -> Result<()>;

    /// Remove the oldest job, waiting up to the configured timeout.
    ///
    /// Returns `Ok(None)` when the wait elapses with nothing queued, or
    /// promptly once `cancel` fires.
    async fn dequeue_job(&self, cancel: &CancellationToken) -> Result<Option<String>>;

    /// Append a serialized result to the result queue.
    async fn enqueue_job_result(&self, payload: &str) -> Result<()>;
}

impl std::fmt::Debug for dyn Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Broker")
    }
}

pub type SharedBroker = Arc<dyn Broker>;

/// Connect to the broker named by `config.url`.
///
/// `redis://` and `rediss://` go to Redis; `memory://` builds a
/// process-local queue. A failure here is fatal to startup.
pub async fn connect(config: &BrokerConfig) -> Result<SharedBroker> {
    let url = config.url.trim();
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);

    match scheme {
        Some("redis") | Some("rediss") => {
            let broker = RedisBroker::connect(
                url,
                &config.job_queue,
                &config.result_queue,
                config.dequeue_timeout(),
            )
            .await?;
            Ok(Arc::new(broker))
        }
        Some("memory") => Ok(Arc::new(MemoryBroker::new(config.dequeue_timeout()))),
        _ => Err(Error::config(format!(
            "Unsupported broker URL '{}' (expected redis://, rediss:// or memory://)",
            url
        ))),
    }
}
