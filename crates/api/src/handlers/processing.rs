//! Handlers for the `/processing` resource.
//!
//! Submissions require an identified caller with access to the project.
//! Status lookups are open: job ids are random and not enumerable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use vantage_core::jobs::{Job, JobPayload, JobStatus, JobType};
use vantage_core::types::JobId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for job submission. Fields are passed through as-is.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProcessing {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Either a job snapshot or a marker for ids the table does not know.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JobStatusView {
    Known(Job),
    Unknown { status: &'static str },
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/processing/mesh
pub async fn submit_mesh(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitProcessing>,
) -> AppResult<impl IntoResponse> {
    submit(auth, state, JobType::Mesh, input).await
}

/// POST /api/v1/processing/pointcloud
pub async fn submit_pointcloud(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitProcessing>,
) -> AppResult<impl IntoResponse> {
    submit(auth, state, JobType::PointCloud, input).await
}

/// POST /api/v1/processing/gaussian-splat
pub async fn submit_gaussian_splat(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitProcessing>,
) -> AppResult<impl IntoResponse> {
    submit(auth, state, JobType::GaussianSplat, input).await
}

/// Record the job, schedule it, and answer `201` with its id.
async fn submit(
    auth: AuthUser,
    state: AppState,
    job_type: JobType,
    input: SubmitProcessing,
) -> AppResult<impl IntoResponse> {
    auth.require_project(&state, &input.project_id).await?;

    let job = state
        .processing
        .submit(
            job_type,
            JobPayload {
                project_id: input.project_id,
                file_path: input.file_path,
            },
        )
        .await;

    tracing::info!(
        job_id = %job.id,
        job_type = %job_type,
        user_id = %auth.user_id,
        "Processing job submitted",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmittedJob {
                job_id: job.id,
                status: job.status,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/processing/status/{job_id}
///
/// Unknown or malformed ids answer `{ "status": "unknown" }` rather than 404.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = match job_id.parse::<JobId>() {
        Ok(id) => state.processing.status(id).await,
        Err(_) => None,
    };
    let view = match job {
        Some(job) => JobStatusView::Known(job),
        None => JobStatusView::Unknown { status: "unknown" },
    };
    Ok(Json(DataResponse { data: view }))
}
