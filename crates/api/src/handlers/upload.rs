//! Handlers for the `/upload` resource.
//!
//! Uploaded files are written under `raw/<project>/<Category>/` and, when the
//! category has a processing recipe, a job is queued for them straight away.

use std::path::Path;

use axum::extract::{Multipart, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use vantage_core::formats::{self, AssetCategory};
use vantage_core::jobs::JobPayload;
use vantage_core::storage::stored_file_name;
use vantage_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    /// Value for an HTML file input `accept` attribute.
    pub accept: String,
    pub extensions: Vec<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub ok: bool,
    pub project_id: String,
    /// Stored path relative to the project's raw directory.
    pub path: String,
    /// Category directory the file was filed under.
    #[serde(rename = "type")]
    pub category: &'static str,
    pub job_id: Option<JobId>,
    /// `queued` when a job was created, `uploaded` otherwise.
    pub status: &'static str,
}

/// GET /api/v1/upload/formats
pub async fn list_formats() -> impl IntoResponse {
    Json(DataResponse {
        data: FormatsResponse {
            accept: formats::accept_attribute(),
            extensions: formats::all_extensions(),
        },
    })
}

/// POST /api/v1/upload
///
/// Multipart fields: `projectId` (or `?projectId=`), then `file`. The
/// project must be known before the file part arrives.
pub async fn upload_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut project_id = query.project_id.filter(|p| !p.is_empty());
    let mut stored: Option<(AssetCategory, String)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("projectId") => {
                let value = field.text().await?;
                if !value.is_empty() {
                    project_id = Some(value);
                }
            }
            Some("file") if stored.is_none() => {
                let project_id = project_id
                    .as_deref()
                    .ok_or_else(|| AppError::BadRequest("projectId required".into()))?;
                auth.require_project(&state, project_id).await?;

                let original = field.file_name().unwrap_or_default().to_string();
                let ext = Path::new(&original)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default()
                    .to_string();
                let category = formats::category_for_extension(&ext).ok_or_else(|| {
                    let shown = if ext.is_empty() {
                        "unknown".to_string()
                    } else {
                        format!(".{ext}")
                    };
                    AppError::BadRequest(format!("Format {shown} not allowed"))
                })?;

                let dir = state.storage.raw_dir(project_id, category.dir_name()).await?;
                let file_name = stored_file_name(&original);
                let dest = dir.join(&file_name);
                if let Err(e) = write_field(&mut field, &dest, state.config.upload_max_bytes).await {
                    let _ = tokio::fs::remove_file(&dest).await;
                    return Err(e);
                }
                stored = Some((category, file_name));
            }
            _ => {}
        }
    }

    let (category, file_name) =
        stored.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let project_id = project_id.unwrap_or_default();
    let relative = format!("{}/{}", category.dir_name(), file_name);

    let job_id = match category.job_type() {
        Some(job_type) => {
            let job = state
                .processing
                .submit(
                    job_type,
                    JobPayload {
                        project_id: project_id.clone(),
                        file_path: relative.clone(),
                    },
                )
                .await;
            Some(job.id)
        }
        None => None,
    };

    tracing::info!(
        project_id = %project_id,
        path = %relative,
        user_id = %auth.user_id,
        job_id = ?job_id,
        "File uploaded",
    );

    Ok(Json(DataResponse {
        data: UploadResponse {
            ok: true,
            project_id,
            path: relative,
            category: category.dir_name(),
            job_id,
            status: if job_id.is_some() { "queued" } else { "uploaded" },
        },
    }))
}

/// Stream one multipart field to `dest`, enforcing `max_bytes`.
async fn write_field(
    field: &mut axum::extract::multipart::Field<'_>,
    dest: &Path,
    max_bytes: u64,
) -> AppResult<()> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create {}: {e}", dest.display())))?;

    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {max_bytes} byte upload limit"
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to write upload: {e}")))?;
    }
    file.flush()
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to write upload: {e}")))?;
    Ok(())
}
