use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use transcodeflow_core::Result;

use super::Broker;

/// Process-local queues with the same blocking semantics as Redis.
#[derive(Debug)]
pub struct MemoryBroker {
    jobs: Mutex<VecDeque<String>>,
    results: Mutex<Vec<String>>,
    job_ready: Notify,
    dequeue_timeout: Duration,
}

impl MemoryBroker {
    pub fn new(dequeue_timeout: Duration) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            results: Mutex::new(Vec::new()),
            job_ready: Notify::new(),
            dequeue_timeout,
        }
    }

    /// Jobs still waiting, oldest first.
    pub fn pending_jobs(&self) -> Vec<String> {
        self.jobs.lock().iter().cloned().collect()
    }

    /// Results published so far, in publish order.
    pub fn results(&self) -> Vec<String> {
        self.results.lock().clone()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn enqueue_job(&self, payload: &str) -> Result<()> {
        self.jobs.lock().push_back(payload.to_string());
        self.job_ready.notify_one();
        Ok(())
    }

    async fn dequeue_job(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + self.dequeue_timeout;

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let next = self.jobs.lock().pop_front();
            if next.is_some() {
                return Ok(next);
            }

            tokio::select! {
                _ = self.job_ready.notified() => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
                _ = cancel.cancelled() => return Ok(None),
            }
        }
    }

    async fn enqueue_job_result(&self, payload: &str) -> Result<()> {
        self.results.lock().push(payload.to_string());
        Ok(())
    }
}
