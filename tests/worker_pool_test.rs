//! Integration tests for the worker pool scheduler.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::{job_json, wait_for, CollectingErrorHandler, FlakyBroker};
use transcodeflow::broker::{Broker, MemoryBroker};
use transcodeflow::telemetry::{Counter, RecordingTelemetry};
use transcodeflow::worker::{ExecutionError, Stage, WorkFunction, WorkerPool};
use transcodeflow_core::{Error, Job, JobResult, Result};

const WAIT: Duration = Duration::from_secs(5);

fn memory_broker() -> Arc<MemoryBroker> {
    Arc::new(MemoryBroker::new(Duration::from_millis(50)))
}

fn decode_results(broker: &MemoryBroker) -> Vec<JobResult> {
    broker
        .results()
        .iter()
        .map(|r| serde_json::from_str(r).unwrap())
        .collect()
}

/// Run `pool` until `done` holds, then cancel and wait for it to stop.
async fn run_until(pool: WorkerPool, mut done: impl FnMut() -> bool) {
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { pool.start(cancel).await })
    };

    assert!(wait_for(WAIT, &mut done).await, "condition not reached");
    cancel.cancel();
    tokio::time::timeout(WAIT, handle)
        .await
        .expect("pool did not stop after cancellation")
        .unwrap();
}

#[tokio::test]
async fn pool_never_exceeds_max_parallelization() {
    let broker = memory_broker();
    for i in 0..3 {
        broker
            .enqueue_job(&job_json(&format!("/in{i}.mp4"), &format!("/out{i}.mkv")))
            .await
            .unwrap();
    }

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let work: Arc<dyn WorkFunction> = {
        let running = running.clone();
        let peak = peak.clone();
        Arc::new(move |job: Job| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ExecutionError>(format!("encoded {}", job.input_file_path))
            }
        })
    };

    let telemetry = Arc::new(RecordingTelemetry::new());
    let pool = WorkerPool::new(broker.clone(), work, 2).with_telemetry(telemetry.clone());

    let watched = broker.clone();
    run_until(pool, move || watched.results().len() == 3).await;

    let results = decode_results(&broker);
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(JobResult::is_success));
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(telemetry.max_in_flight() <= 2);
    assert_eq!(telemetry.count(Counter::WorkerJobs, "success"), 3);
}

#[tokio::test]
async fn decode_failure_is_reported_and_pool_continues() {
    let broker = memory_broker();
    broker.enqueue_job("{definitely not a job").await.unwrap();
    broker
        .enqueue_job(&job_json("/in.mp4", "/out.mkv"))
        .await
        .unwrap();

    let handler = Arc::new(CollectingErrorHandler::default());
    let work: Arc<dyn WorkFunction> =
        Arc::new(|_job: Job| async move { Ok::<_, ExecutionError>("ok".to_string()) });
    let pool = WorkerPool::new(broker.clone(), work, 1).with_error_handler(handler.clone());

    let watched = broker.clone();
    run_until(pool, move || watched.results().len() == 1).await;

    let errors = handler.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, Stage::Decode);
    assert_eq!(errors[0].payload.as_deref(), Some("{definitely not a job"));

    let results = decode_results(&broker);
    assert_eq!(results[0].job.input_file_path, "/in.mp4");
}

#[tokio::test]
async fn dequeue_failure_is_reported_and_slot_replaced() {
    let inner = memory_broker();
    inner
        .enqueue_job(&job_json("/in.mp4", "/out.mkv"))
        .await
        .unwrap();
    let broker = Arc::new(FlakyBroker::new(inner.clone(), 2));

    let handler = Arc::new(CollectingErrorHandler::default());
    let telemetry = Arc::new(RecordingTelemetry::new());
    let work: Arc<dyn WorkFunction> =
        Arc::new(|_job: Job| async move { Ok::<_, ExecutionError>(String::new()) });
    let pool = WorkerPool::new(broker, work, 1)
        .with_error_handler(handler.clone())
        .with_telemetry(telemetry.clone())
        .with_error_backoff(Duration::from_millis(10));

    let watched = inner.clone();
    run_until(pool, move || watched.results().len() == 1).await;

    let errors = handler.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.stage == Stage::Dequeue && e.payload.is_none()));
    assert_eq!(telemetry.count(Counter::WorkerErrors, "dequeue"), 2);
}

#[tokio::test]
async fn tool_failure_is_published_not_escalated() {
    let broker = memory_broker();
    broker
        .enqueue_job(&job_json("/in.mp4", "/out.mkv"))
        .await
        .unwrap();

    let handler = Arc::new(CollectingErrorHandler::default());
    let work: Arc<dyn WorkFunction> = Arc::new(|_job: Job| async move {
        Err::<String, _>(ExecutionError::Exit {
            program: "ffmpeg".into(),
            status: "exit status: 1".into(),
            output: "Unknown encoder 'av1_qsv'".into(),
        })
    });
    let pool = WorkerPool::new(broker.clone(), work, 1).with_error_handler(handler.clone());

    let watched = broker.clone();
    run_until(pool, move || watched.results().len() == 1).await;

    let results = decode_results(&broker);
    assert!(!results[0].is_success());
    assert_eq!(results[0].output, "Unknown encoder 'av1_qsv'");
    assert_eq!(
        results[0].error.as_deref(),
        Some("ffmpeg exited with exit status: 1")
    );
    assert!(handler.errors().is_empty());
}

#[tokio::test]
async fn launch_failure_is_reported_and_published() {
    let broker = memory_broker();
    broker
        .enqueue_job(&job_json("/in.mp4", "/out.mkv"))
        .await
        .unwrap();

    let handler = Arc::new(CollectingErrorHandler::default());
    let work: Arc<dyn WorkFunction> = Arc::new(|_job: Job| async move {
        Err::<String, _>(ExecutionError::Launch {
            program: "ffmpeg".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    });
    let pool = WorkerPool::new(broker.clone(), work, 1).with_error_handler(handler.clone());

    let watched = broker.clone();
    run_until(pool, move || watched.results().len() == 1).await;

    let errors = handler.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, Stage::Execute);
    assert!(errors[0].payload.is_some());
    assert!(!decode_results(&broker)[0].is_success());
}

/// Accepts dequeues from a memory broker but refuses every result.
struct ResultlessBroker(Arc<MemoryBroker>);

#[async_trait]
impl Broker for ResultlessBroker {
    async fn enqueue_job(&self, payload: &str) -> Result<()> {
        self.0.enqueue_job(payload).await
    }

    async fn dequeue_job(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        self.0.dequeue_job(cancel).await
    }

    async fn enqueue_job_result(&self, _payload: &str) -> Result<()> {
        Err(Error::broker("result queue unavailable"))
    }
}

#[tokio::test]
async fn publish_failure_is_reported() {
    let inner = memory_broker();
    inner
        .enqueue_job(&job_json("/in.mp4", "/out.mkv"))
        .await
        .unwrap();

    let handler = Arc::new(CollectingErrorHandler::default());
    let work: Arc<dyn WorkFunction> =
        Arc::new(|_job: Job| async move { Ok::<_, ExecutionError>(String::new()) });
    let pool = WorkerPool::new(Arc::new(ResultlessBroker(inner.clone())), work, 1)
        .with_error_handler(handler.clone())
        .with_error_backoff(Duration::from_millis(10));

    let seen = handler.clone();
    run_until(pool, move || !seen.errors().is_empty()).await;

    let errors = handler.errors();
    assert_eq!(errors[0].stage, Stage::Publish);
    assert!(errors[0].message.contains("result queue unavailable"));
    assert!(inner.pending_jobs().is_empty());
}

#[tokio::test]
async fn cancellation_lets_running_job_finish() {
    let broker = Arc::new(MemoryBroker::new(Duration::from_secs(3600)));
    broker
        .enqueue_job(&job_json("/in.mp4", "/out.mkv"))
        .await
        .unwrap();

    let started = Arc::new(AtomicUsize::new(0));
    let work: Arc<dyn WorkFunction> = {
        let started = started.clone();
        Arc::new(move |_job: Job| {
            let started = started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok::<_, ExecutionError>("finished".to_string())
            }
        })
    };
    let pool = WorkerPool::new(broker.clone(), work, 3);

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { pool.start(cancel).await })
    };

    assert!(wait_for(WAIT, || started.load(Ordering::SeqCst) == 1).await);
    cancel.cancel();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();

    let results = decode_results(&broker);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].output, "finished");
}
