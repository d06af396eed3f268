use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio_util::sync::CancellationToken;
use transcodeflow_core::{Error, Result};

use super::Broker;

/// Longest single `BRPOP`; cancellation is checked between pops.
const POP_SLICE: Duration = Duration::from_millis(500);

/// Split a dequeue timeout into the `BRPOP` timeouts issued one after another.
fn pop_slices(total: Duration) -> impl Iterator<Item = Duration> {
    let mut remaining = total;
    std::iter::from_fn(move || {
        if remaining.is_zero() {
            return None;
        }
        let slice = remaining.min(POP_SLICE);
        remaining -= slice;
        Some(slice)
    })
}

/// Redis lists as queues: `LPUSH` to append, `BRPOP` to take the oldest.
pub struct RedisBroker {
    client: Client,
    conn: ConnectionManager,
    job_queue: String,
    result_queue: String,
    dequeue_timeout: Duration,
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker")
            .field("client", &self.client)
            .field("job_queue", &self.job_queue)
            .field("result_queue", &self.result_queue)
            .field("dequeue_timeout", &self.dequeue_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisBroker {
    /// Open a client and verify the server answers `PING`.
    pub async fn connect(
        url: &str,
        job_queue: &str,
        result_queue: &str,
        dequeue_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::open(url).map_err(Error::broker)?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::broker(format!("Failed to connect to {}: {}", url, e)))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Error::broker)?;
        tracing::debug!(url, reply = %pong, "Connected to Redis");

        Ok(Self {
            client,
            conn,
            job_queue: job_queue.to_string(),
            result_queue: result_queue.to_string(),
            dequeue_timeout,
        })
    }

    async fn push(&self, queue: &str, payload: &str) -> Result<()> {
        // ConnectionManager is a cheap handle over one multiplexed connection.
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(queue, payload)
            .await
            .map_err(Error::broker)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue_job(&self, payload: &str) -> Result<()> {
        self.push(&self.job_queue, payload).await
    }

    async fn dequeue_job(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        // A blocking pop on the shared connection would stall every other
        // command behind it, so each pop gets its own connection.
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(Error::broker)?;

        // Each BRPOP runs to completion: dropping one whose reply is already
        // in flight would lose the popped job.
        for slice in pop_slices(self.dequeue_timeout) {
            let popped: Option<(String, String)> = conn
                .brpop(&self.job_queue, slice.as_secs_f64())
                .await
                .map_err(Error::broker)?;

            if let Some((_queue, payload)) = popped {
                return Ok(Some(payload));
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        Ok(None)
    }

    async fn enqueue_job_result(&self, payload: &str) -> Result<()> {
        self.push(&self.result_queue, payload).await
    }
}
