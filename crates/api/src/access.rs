//! Project access directory.
//!
//! Answers two questions for the HTTP layer: which user an API key belongs
//! to, and whether a user may touch a project. Backed by JSON files under
//! the storage root that other parts of the system maintain; this module only
//! reads them. Missing files are treated as empty.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use vantage_core::error::CoreError;
use vantage_core::types::UserId;

/// Read-only view of project ownership, sharing and API keys.
#[async_trait]
pub trait ProjectAccess: Send + Sync {
    /// Whether `user_id` may access `project_id`.
    ///
    /// Granted to the owner, to users the project is shared with, and to
    /// everyone for projects without an owner. Unknown projects are denied.
    async fn can_access(&self, project_id: &str, user_id: &str) -> Result<bool, CoreError>;

    /// The user an API key was issued to.
    async fn user_for_api_key(&self, api_key: &str) -> Result<Option<UserId>, CoreError>;
}

// ---------------------------------------------------------------------------
// File-backed implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    id: String,
    #[serde(default)]
    owner_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Integrations {
    #[serde(default)]
    api_keys: HashMap<UserId, Option<ApiKeyRecord>>,
}

#[derive(Debug, Deserialize)]
struct ApiKeyRecord {
    #[serde(default)]
    key: Option<String>,
}

/// [`ProjectAccess`] over `projects.json`, `sharing.json` and
/// `integrations.json`. Files are re-read on every call so edits made by
/// other processes are picked up immediately.
#[derive(Debug, Clone)]
pub struct FileProjectDirectory {
    projects_path: PathBuf,
    sharing_path: PathBuf,
    integrations_path: PathBuf,
}

impl FileProjectDirectory {
    pub fn new(
        projects_path: impl Into<PathBuf>,
        sharing_path: impl Into<PathBuf>,
        integrations_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            projects_path: projects_path.into(),
            sharing_path: sharing_path.into(),
            integrations_path: integrations_path.into(),
        }
    }

    async fn projects(&self) -> Result<Vec<ProjectRecord>, CoreError> {
        // A file holding anything but an array counts as no projects.
        let raw: Option<Value> = read_json(&self.projects_path).await?;
        Ok(match raw {
            Some(value @ Value::Array(_)) => serde_json::from_value(value)
                .map_err(|e| CoreError::Internal(format!("Invalid projects file: {e}")))?,
            _ => Vec::new(),
        })
    }

    /// Whether `sharing.json` lists `user_id` for the project.
    async fn is_shared_with(&self, project_id: &str, user_id: &str) -> Result<bool, CoreError> {
        let sharing: Option<HashMap<String, Value>> = read_json(&self.sharing_path).await?;
        let Some(entries) = sharing.as_ref().and_then(|s| s.get(project_id)) else {
            return Ok(false);
        };
        let shared = entries.as_array().is_some_and(|list| {
            list.iter()
                .any(|share| share.get("email").and_then(Value::as_str) == Some(user_id))
        });
        Ok(shared)
    }
}

#[async_trait]
impl ProjectAccess for FileProjectDirectory {
    async fn can_access(&self, project_id: &str, user_id: &str) -> Result<bool, CoreError> {
        let projects = self.projects().await?;
        let Some(project) = projects.iter().find(|p| p.id == project_id) else {
            return Ok(false);
        };
        match project.owner_id.as_deref() {
            None => Ok(true),
            Some(owner) if owner == user_id => Ok(true),
            Some(_) => self.is_shared_with(project_id, user_id).await,
        }
    }

    async fn user_for_api_key(&self, api_key: &str) -> Result<Option<UserId>, CoreError> {
        if api_key.is_empty() {
            return Ok(None);
        }
        let integrations: Integrations =
            read_json(&self.integrations_path).await?.unwrap_or_default();
        Ok(integrations
            .api_keys
            .into_iter()
            .find(|(_, record)| {
                record
                    .as_ref()
                    .and_then(|r| r.key.as_deref())
                    .is_some_and(|k| k == api_key)
            })
            .map(|(user_id, _)| user_id))
    }
}

/// Read and parse a JSON file; `None` when it does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&text).map(Some).map_err(|e| {
        CoreError::Internal(format!("Invalid JSON in {}: {e}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
