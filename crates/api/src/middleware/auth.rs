//! Caller identity extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use vantage_core::error::CoreError;
use vantage_core::types::UserId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Header carrying an API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying a bare user id, used when no API key is presented.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identified caller.
///
/// Resolution order:
/// 1. `X-API-Key: <key>` or `Authorization: Bearer <key>`, looked up in the
///    access directory. An unknown key falls through to the next step.
/// 2. `X-User-Id: <id>`.
///
/// Rejects with 401 when neither yields a user.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let api_key = header(API_KEY_HEADER).or_else(|| {
            header("authorization")
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });

        if let Some(key) = api_key {
            if let Some(user_id) = state.access.user_for_api_key(key).await? {
                return Ok(AuthUser { user_id });
            }
        }

        match header(USER_ID_HEADER) {
            Some(user_id) => Ok(AuthUser {
                user_id: user_id.to_string(),
            }),
            None => Err(AppError::Core(CoreError::Unauthorized(
                "Authentication required".into(),
            ))),
        }
    }
}

impl AuthUser {
    /// Fail with 403 unless this user may access `project_id`.
    pub async fn require_project(&self, state: &AppState, project_id: &str) -> AppResult<()> {
        if state.access.can_access(project_id, &self.user_id).await? {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, project_id, "Project access denied");
            Err(AppError::Core(CoreError::Forbidden("Access denied".into())))
        }
    }
}
