//! Route definitions for the `/processing` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::processing;
use crate::state::AppState;

/// Routes mounted at `/processing`.
///
/// ```text
/// POST   /mesh                -> submit_mesh
/// POST   /pointcloud          -> submit_pointcloud
/// POST   /gaussian-splat      -> submit_gaussian_splat
/// GET    /status/{job_id}     -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mesh", post(processing::submit_mesh))
        .route("/pointcloud", post(processing::submit_pointcloud))
        .route("/gaussian-splat", post(processing::submit_gaussian_splat))
        .route("/status/{job_id}", get(processing::get_status))
}
