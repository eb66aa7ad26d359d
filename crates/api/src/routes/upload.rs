use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::upload;
use crate::state::AppState;

/// Routes mounted at `/upload`.
///
/// ```text
/// POST   /                    -> upload_file
/// GET    /formats             -> list_formats
/// ```
///
/// The default body limit is lifted for uploads; the handler enforces the
/// configured maximum while streaming to disk.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(upload::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/formats", get(upload::list_formats))
}
