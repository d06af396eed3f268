//! `POST /submit`: validate one job and push it onto the job queue.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use transcodeflow_core::{Error, Job};

use super::error::AppError;
use super::AppContext;
use crate::telemetry::{Counter, Event};

pub async fn submit_job(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    match accept(&ctx, &body).await {
        Ok(job) => {
            ctx.telemetry.increment(Counter::ServerRequests, "success");
            ctx.telemetry.increment(Counter::TranscodingJobs, "job_pushed");

            let summary = job.summary();
            ctx.telemetry.record(&Event::JobSubmitted {
                input: job.input_file_path.clone(),
                output: job.output_file_path.clone(),
                preset: summary.preset,
                advanced: summary.advanced,
                hardware_acceleration: summary.hardware_acceleration,
                dry_run: summary.dry_run,
            });
            tracing::debug!(
                input = %job.input_file_path,
                output = %job.output_file_path,
                preset = %summary.preset,
                audio = summary.audio_quality.bitrate(),
                resolution = summary.resolution,
                keep_original_resolution = summary.keep_original_resolution,
                has_global_args = summary.has_global_args,
                has_input_args = summary.has_input_args,
                has_output_args = summary.has_output_args,
                "Enqueued job"
            );

            Ok((StatusCode::ACCEPTED, "Job submitted"))
        }
        Err(e) => {
            ctx.telemetry.increment(Counter::ServerRequests, "failed");
            Err(e)
        }
    }
}

async fn accept(ctx: &AppContext, body: &[u8]) -> Result<Job, AppError> {
    let mut job = Job::from_json(body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed job");
        AppError::bad_request("Invalid job format")
    })?;

    // Device selection belongs to the worker tier.
    job.hardware_device.clear();

    job.validate().map_err(|e| {
        tracing::warn!(error = %e, "Rejected invalid job");
        AppError::from(e)
    })?;

    let payload = job.to_json()?;

    match tokio::time::timeout(ctx.enqueue_timeout, ctx.broker.enqueue_job(&payload)).await {
        Ok(Ok(())) => Ok(job),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(Error::Timeout(format!(
            "enqueue did not finish within {:?}",
            ctx.enqueue_timeout
        ))
        .into()),
    }
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        "Method not allowed",
    )
}
