//! HTTP/JSON transport
//!
//! # API Endpoints
//!
//! ## POST|GET /start-workflow
//!
//! Start one kiosk order workflow and wait until it pauses at its first wait
//! task (or completes).
//!
//! ### Response
//!
//! ```json
//! {
//!   "workflowId": "0c4a4c1e-..."
//! }
//! ```
//!
//! Failures return `502 Bad Gateway` with `{"error": "..."}`.
//!
//! ## GET /health
//!
//! Health check endpoint. Returns "OK" with 200 status.
//!
//! ## GET /metrics
//!
//! Prometheus text export of route counters and, while a load test is
//! attached, its live counters.

use super::Transport;
use crate::metrics::{Metrics, Route, StartOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::get,
};
use kiosk::gateway::is_success;
use kiosk::{
    CompletionTracker, StartedWorkflow, StopToken, TransientRetryPolicy, WorkError,
    WorkflowGateway, call_with_retry,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Successful `/start-workflow` response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowResponse {
    pub workflow_id: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error message
    pub error: String,
}

/// HTTP transport implementation
pub struct HttpTransport {
    addr: SocketAddr,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid HTTP listen address {host}:{port}"))?;
        Ok(Self { addr })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(self, state: Arc<AppState>, mut shutdown: StopToken) -> Result<()> {
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.stopped().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/start-workflow",
            get(handle_start_workflow).post(handle_start_workflow),
        )
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

/// State shared by every request
pub struct AppState {
    gateway: Arc<dyn WorkflowGateway>,
    retry: TransientRetryPolicy,
    /// Sequence numbers for workflows started through the route
    sequence: AtomicU64,
    metrics: Arc<Metrics>,
    /// Tracker of the load test running in this process, if any
    load_test: RwLock<Option<Arc<CompletionTracker>>>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn WorkflowGateway>,
        retry: TransientRetryPolicy,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            gateway,
            retry,
            sequence: AtomicU64::new(0),
            metrics,
            load_test: RwLock::new(None),
        }
    }

    /// Expose a load test's counters through `/metrics`
    pub fn attach_load_test(&self, tracker: Arc<CompletionTracker>) {
        *self.load_test.write() = Some(tracker);
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Start a workflow, retrying transient transport failures per policy
    async fn start_workflow(&self, sequence: u64) -> Result<StartedWorkflow, WorkError> {
        let gateway = &*self.gateway;
        let started =
            call_with_retry(self.retry, sequence, move || gateway.start_workflow(sequence))
                .await?;

        if !is_success(started.status) {
            return Err(WorkError::StartFailed {
                status: started.status,
            });
        }
        Ok(started)
    }
}

async fn handle_start_workflow(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StartWorkflowResponse>, (StatusCode, Json<HttpErrorResponse>)> {
    state.metrics.record_request(Route::StartWorkflow);

    let started_at = Instant::now();
    let sequence = state.sequence.fetch_add(1, Ordering::Relaxed);
    let result = state.start_workflow(sequence).await;
    let latency_us = started_at.elapsed().as_micros() as u64;

    match result {
        Ok(started) => {
            state.metrics.record_start(latency_us, StartOutcome::Started);
            Ok(Json(StartWorkflowResponse {
                workflow_id: started.workflow_id,
            }))
        }
        Err(e) => {
            let outcome = if e.is_transient() {
                StartOutcome::Throttled
            } else {
                StartOutcome::Failed
            };
            state.metrics.record_start(latency_us, outcome);

            tracing::error!(sequence, "Failed to start workflow: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(HttpErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> &'static str {
    state.metrics.record_request(Route::Health);
    "OK"
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.record_request(Route::Metrics);

    let snapshot = state
        .load_test
        .read()
        .as_ref()
        .map(|tracker| tracker.snapshot());

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(snapshot.as_ref()),
    )
}
