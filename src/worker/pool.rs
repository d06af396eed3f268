//! Bounded pool of job-processing tasks.
//!
//! Each task performs exactly one unit of work (dequeue, decode, execute,
//! publish) and then reports a [`TaskOutcome`] on the completion channel.
//! The scheduler starts a replacement for every completion until the pool
//! is cancelled, so the number of live tasks never exceeds the configured
//! limit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use transcodeflow_core::{Job, JobResult};

use super::{ErrorHandler, LogErrorHandler, Stage, WorkFunction, WorkerError};
use crate::broker::SharedBroker;
use crate::telemetry::{Counter, Event, NoopTelemetry, SharedTelemetry};

/// Delay before replacing a slot whose broker call failed.
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    /// The dequeue timed out with nothing queued.
    Idle,
    /// A job ran and its result was published.
    Completed { success: bool },
    Failed(Stage),
    Cancelled,
    Panicked,
}

pub struct WorkerPool {
    broker: SharedBroker,
    work: Arc<dyn WorkFunction>,
    error_handler: Arc<dyn ErrorHandler>,
    telemetry: SharedTelemetry,
    max_parallelization: usize,
    error_backoff: Duration,
}

impl WorkerPool {
    /// `max_parallelization` is clamped to at least one.
    pub fn new(
        broker: SharedBroker,
        work: Arc<dyn WorkFunction>,
        max_parallelization: usize,
    ) -> Self {
        Self {
            broker,
            work,
            error_handler: Arc::new(LogErrorHandler),
            telemetry: Arc::new(NoopTelemetry),
            max_parallelization: max_parallelization.max(1),
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn with_telemetry(mut self, telemetry: SharedTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn max_parallelization(&self) -> usize {
        self.max_parallelization
    }

    /// Run until `cancel` fires, then wait for every in-flight task to exit.
    ///
    /// Tasks blocked on a dequeue return as soon as cancellation is observed.
    /// Tasks already executing a job run it to completion and publish the
    /// result first.
    pub async fn start(&self, cancel: CancellationToken) {
        let (done_tx, mut done_rx) = mpsc::channel::<TaskOutcome>(self.max_parallelization);
        let mut in_flight = 0usize;

        tracing::info!(
            max_parallelization = self.max_parallelization,
            "Worker pool started"
        );

        loop {
            while in_flight < self.max_parallelization && !cancel.is_cancelled() {
                self.spawn_task(done_tx.clone(), cancel.clone());
                in_flight += 1;
            }
            self.telemetry.set_in_flight(in_flight);

            if in_flight == 0 {
                break;
            }

            // The pool keeps `done_tx` alive, so this only yields `Some`.
            let Some(outcome) = done_rx.recv().await else {
                break;
            };
            in_flight -= 1;

            match outcome {
                TaskOutcome::Idle => tracing::trace!("Job queue empty"),
                TaskOutcome::Completed { success } => {
                    tracing::trace!(success, "Task completed")
                }
                TaskOutcome::Failed(stage) => tracing::debug!(%stage, "Task failed"),
                TaskOutcome::Cancelled => tracing::trace!("Task observed cancellation"),
                TaskOutcome::Panicked => tracing::warn!("Task panicked, slot replaced"),
            }
        }

        self.telemetry.set_in_flight(0);
        tracing::info!("Worker pool stopped");
    }

    fn spawn_task(&self, done: mpsc::Sender<TaskOutcome>, cancel: CancellationToken) {
        let task = Task {
            broker: self.broker.clone(),
            work: self.work.clone(),
            error_handler: self.error_handler.clone(),
            telemetry: self.telemetry.clone(),
            error_backoff: self.error_backoff,
        };
        let reporter = task.clone();

        tokio::spawn(async move {
            // Running the unit in its own task turns a panic into a JoinError
            // instead of a slot that never reports back.
            let outcome = match tokio::spawn(task.run(cancel)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    reporter.report(WorkerError::new(Stage::Execute, None, e));
                    TaskOutcome::Panicked
                }
            };
            let _ = done.send(outcome).await;
        });
    }
}

#[derive(Clone)]
struct Task {
    broker: SharedBroker,
    work: Arc<dyn WorkFunction>,
    error_handler: Arc<dyn ErrorHandler>,
    telemetry: SharedTelemetry,
    error_backoff: Duration,
}

impl Task {
    async fn run(self, cancel: CancellationToken) -> TaskOutcome {
        if cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        let payload = match self.broker.dequeue_job(&cancel).await {
            Ok(Some(payload)) => payload,
            Ok(None) if cancel.is_cancelled() => return TaskOutcome::Cancelled,
            Ok(None) => return TaskOutcome::Idle,
            Err(e) => {
                self.report(WorkerError::new(Stage::Dequeue, None, e));
                self.back_off(&cancel).await;
                return TaskOutcome::Failed(Stage::Dequeue);
            }
        };

        let job = match Job::from_json(payload.as_bytes()) {
            Ok(job) => job,
            Err(e) => {
                self.report(WorkerError::new(Stage::Decode, Some(payload), e));
                return TaskOutcome::Failed(Stage::Decode);
            }
        };

        tracing::info!(
            input = %job.input_file_path,
            output = %job.output_file_path,
            "Processing job"
        );

        let started = Instant::now();
        let result = match self.work.execute(job.clone()).await {
            Ok(output) => JobResult::success(job, output),
            Err(e) => {
                if e.is_launch_failure() {
                    self.report(WorkerError::new(Stage::Execute, Some(payload.clone()), &e));
                } else {
                    tracing::warn!(
                        input = %job.input_file_path,
                        error = %e,
                        "Transcoder reported failure"
                    );
                }
                let output = e.output().to_string();
                JobResult::failure(job, output, e)
            }
        };

        let success = result.is_success();
        self.telemetry.increment(
            Counter::WorkerJobs,
            if success { "success" } else { "failed" },
        );
        self.telemetry.record(&Event::JobCompleted {
            input: result.job.input_file_path.clone(),
            output: result.job.output_file_path.clone(),
            success,
            elapsed: started.elapsed(),
        });

        let encoded = match result.to_json() {
            Ok(encoded) => encoded,
            Err(e) => {
                self.report(WorkerError::new(Stage::Publish, Some(payload), e));
                return TaskOutcome::Failed(Stage::Publish);
            }
        };

        if let Err(e) = self.broker.enqueue_job_result(&encoded).await {
            self.report(WorkerError::new(Stage::Publish, Some(payload), e));
            self.back_off(&cancel).await;
            return TaskOutcome::Failed(Stage::Publish);
        }

        TaskOutcome::Completed { success }
    }

    fn report(&self, err: WorkerError) {
        self.telemetry.increment(Counter::WorkerErrors, err.stage.as_str());
        self.telemetry.record(&Event::WorkerFault {
            stage: err.stage.as_str(),
            error: err.message.clone(),
        });
        self.error_handler.handle_error(&err);
    }

    async fn back_off(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(self.error_backoff) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
