//! Handlers for the `/presence` resource.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use vantage_core::presence::PresenceEntry;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewersResponse {
    pub viewers: Vec<PresenceEntry>,
}

/// POST /api/v1/presence/heartbeat
///
/// Marks the caller as viewing the project. `userName` defaults to the
/// caller's id.
pub async fn heartbeat(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<HeartbeatRequest>,
) -> AppResult<impl IntoResponse> {
    let project_id = input
        .project_id
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("projectId required".into()))?;
    auth.require_project(&state, &project_id).await?;

    let entry = state
        .presence
        .heartbeat(
            &project_id,
            &auth.user_id,
            input.user_name.as_deref().unwrap_or_default(),
        )
        .await;
    Ok(Json(DataResponse { data: entry }))
}

/// GET /api/v1/presence/{project_id}
///
/// Current viewers, oldest heartbeat first.
pub async fn list_viewers(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    auth.require_project(&state, &project_id).await?;

    let viewers = state.presence.viewers(&project_id).await;
    Ok(Json(DataResponse {
        data: ViewersResponse { viewers },
    }))
}
