//! Health check endpoint.
//!
//! Provides a simple health check endpoint for load balancers and monitoring systems.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether a metrics reader is configured.
    pub metrics_enabled: bool,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check handler.
///
/// The server is healthy even when metrics are disabled; `metrics_enabled`
/// tells callers whether to render a "metrics unavailable" state.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "lookout-api",
        version: env!("CARGO_PKG_VERSION"),
        metrics_enabled: state.metrics_query_service().is_enabled(),
    })
}
