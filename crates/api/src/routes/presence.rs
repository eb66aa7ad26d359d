//! Route definitions for the `/presence` resource.
//!
//! All endpoints require an identified caller with access to the project.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::presence;
use crate::state::AppState;

/// Routes mounted at `/presence`.
///
/// ```text
/// POST   /heartbeat           -> heartbeat
/// GET    /{project_id}        -> list_viewers
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/heartbeat", post(presence::heartbeat))
        .route("/{project_id}", get(presence::list_viewers))
}
