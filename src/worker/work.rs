use std::future::Future;

use async_trait::async_trait;
use transcodeflow_core::Job;

/// Why a job did not produce a successful run.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The tool could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Exit {
        program: String,
        status: String,
        /// Whatever the tool printed before exiting.
        output: String,
    },
}

impl ExecutionError {
    /// Captured tool output, empty when the tool never ran.
    pub fn output(&self) -> &str {
        match self {
            ExecutionError::Launch { .. } => "",
            ExecutionError::Exit { output, .. } => output,
        }
    }

    /// Launch failures are system faults; exit failures belong to the job.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExecutionError::Launch { .. })
    }
}

/// What the pool runs for every dequeued job.
///
/// Returns the captured output on success. Async closures taking a [`Job`]
/// implement this directly.
#[async_trait]
pub trait WorkFunction: Send + Sync {
    async fn execute(&self, job: Job) -> Result<String, ExecutionError>;
}

#[async_trait]
impl<F, Fut> WorkFunction for F
where
    F: Fn(Job) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ExecutionError>> + Send + 'static,
{
    async fn execute(&self, job: Job) -> Result<String, ExecutionError> {
        (self)(job).await
    }
}
