//! HTTP submission endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::broker::SharedBroker;
use crate::config::ServerConfig;
use crate::telemetry::SharedTelemetry;

mod error;
mod submit;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub broker: SharedBroker,
    pub telemetry: SharedTelemetry,
    /// Upper bound on one enqueue call.
    pub enqueue_timeout: Duration,
}

impl AppContext {
    pub fn new(broker: SharedBroker, telemetry: SharedTelemetry, config: &ServerConfig) -> Self {
        Self {
            broker,
            telemetry,
            enqueue_timeout: config.enqueue_timeout(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/submit",
            post(submit::submit_job).fallback(submit::method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Serve the submission endpoint until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    ctx: AppContext,
    cancel: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
