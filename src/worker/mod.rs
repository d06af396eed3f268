//! Worker tier: pull jobs off the queue, run them, publish results.

mod ffmpeg;
mod pool;
mod work;

pub use ffmpeg::FfmpegTranscoder;
pub use pool::WorkerPool;
pub use work::{ExecutionError, WorkFunction};

use std::fmt;

/// Step of a task's unit of work that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Dequeue,
    Decode,
    Execute,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dequeue => "dequeue",
            Stage::Decode => "decode",
            Stage::Execute => "execute",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault reported by a worker task.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct WorkerError {
    pub stage: Stage,
    /// Raw payload being processed, if one had been dequeued.
    pub payload: Option<String>,
    pub message: String,
}

impl WorkerError {
    pub fn new(stage: Stage, payload: Option<String>, error: impl fmt::Display) -> Self {
        Self {
            stage,
            payload,
            message: error.to_string(),
        }
    }
}

/// Receives every fault the pool reports.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, err: &WorkerError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&WorkerError) + Send + Sync,
{
    fn handle_error(&self, err: &WorkerError) {
        (self)(err)
    }
}

/// Logs each fault and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle_error(&self, err: &WorkerError) {
        tracing::error!(
            stage = %err.stage,
            payload = err.payload.as_deref().unwrap_or(""),
            error = %err.message,
            "Worker error"
        );
    }
}
