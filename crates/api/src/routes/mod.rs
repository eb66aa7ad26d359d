pub mod health;
pub mod presence;
pub mod processing;
pub mod upload;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /collab                                WebSocket (collaboration rooms)
///
/// /processing/mesh                       submit mesh job (POST)
/// /processing/pointcloud                 submit point-cloud job (POST)
/// /processing/gaussian-splat             submit splat job (POST)
/// /processing/status/{job_id}            job status (GET)
///
/// /presence/heartbeat                    mark caller as viewing (POST)
/// /presence/{project_id}                 current viewers (GET)
/// ```
///
/// `/upload` is mounted separately by the app so that it sits outside the
/// request timeout.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/collab", get(ws::collab_handler))
        .nest("/processing", processing::router())
        .nest("/presence", presence::router())
}
