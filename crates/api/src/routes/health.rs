use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Processing jobs currently running.
    pub active_jobs: usize,
    /// Processing jobs waiting for a worker slot.
    pub pending_jobs: usize,
    /// Open collaboration sockets.
    pub ws_connections: usize,
}

/// GET /health -- returns service status and worker load.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pool = state.processing.pool();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_jobs: pool.active(),
        pending_jobs: pool.pending(),
        ws_connections: state.ws_manager.connection_count().await,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
