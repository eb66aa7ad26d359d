//! On-disk layout of project assets.
//!
//! ```text
//! {root}/{raw}/{project_id}/{Category}/{file}          uploaded inputs
//! {root}/{processed}/{project_id}/{Category}/...       worker outputs
//! {root}/{annotations}/{project_id}.json
//! {root}/{config}/{project_id}.json
//! ```

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::fs;

use crate::error::CoreError;

/// Maximum length of the sanitized stem of a stored upload.
const MAX_STEM_LEN: usize = 100;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("valid regex"));

/// Directory names making up the storage tree.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub root: PathBuf,
    pub raw_subdir: String,
    pub processed_subdir: String,
    pub annotations_subdir: String,
    pub config_subdir: String,
}

impl StorageLayout {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("Storage"),
            raw_subdir: "raw".into(),
            processed_subdir: "processed".into(),
            annotations_subdir: "annotations".into(),
            config_subdir: "config".into(),
        }
    }
}

/// Resolves and creates project asset directories.
#[derive(Debug, Clone)]
pub struct FileStorage {
    layout: StorageLayout,
}

impl FileStorage {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Path of a file at the storage root (e.g. `projects.json`).
    pub fn root_file(&self, name: &str) -> PathBuf {
        self.layout.root.join(name)
    }

    /// `{root}/{raw}/{project_id}/{category}`, created if absent.
    pub async fn raw_dir(&self, project_id: &str, category: &str) -> Result<PathBuf, CoreError> {
        let dir = self
            .project_dir(&self.layout.raw_subdir, project_id)?
            .join(checked_relative(category)?);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// `{root}/{processed}/{project_id}/{category}`, created if absent.
    pub async fn processed_dir(
        &self,
        project_id: &str,
        category: &str,
    ) -> Result<PathBuf, CoreError> {
        let dir = self
            .project_dir(&self.layout.processed_subdir, project_id)?
            .join(checked_relative(category)?);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Absolute path of an uploaded input. Nothing is created.
    pub fn raw_file_path(&self, project_id: &str, relative: &str) -> Result<PathBuf, CoreError> {
        Ok(self
            .project_dir(&self.layout.raw_subdir, project_id)?
            .join(checked_relative(relative)?))
    }

    /// Remove every trace of a project. Missing paths are not an error.
    pub async fn delete_project_data(&self, project_id: &str) -> Result<(), CoreError> {
        let dirs = [
            self.project_dir(&self.layout.raw_subdir, project_id)?,
            self.project_dir(&self.layout.processed_subdir, project_id)?,
        ];
        for dir in dirs {
            match fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let files = [
            self.project_file(&self.layout.annotations_subdir, project_id)?,
            self.project_file(&self.layout.config_subdir, project_id)?,
        ];
        for file in files {
            match fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(project_id, "Deleted project data");
        Ok(())
    }

    fn project_dir(&self, subdir: &str, project_id: &str) -> Result<PathBuf, CoreError> {
        Ok(self.layout.root.join(subdir).join(checked_segment(project_id)?))
    }

    fn project_file(&self, subdir: &str, project_id: &str) -> Result<PathBuf, CoreError> {
        let name = format!("{}.json", checked_segment(project_id)?);
        Ok(self.layout.root.join(subdir).join(name))
    }
}

/// Build the stored name for an upload: sanitized stem, a short random
/// suffix, and the original extension.
pub fn stored_file_name(original: &str) -> String {
    let path = Path::new(original);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    let safe: String = UNSAFE_FILENAME_CHARS
        .replace_all(stem, "_")
        .chars()
        .take(MAX_STEM_LEN)
        .collect();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{safe}_{}{ext}", &suffix[..8])
}

/// A single path segment: non-empty, no separators, not `.`/`..`.
fn checked_segment(segment: &str) -> Result<&str, CoreError> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(segment),
        _ => Err(CoreError::Validation(format!(
            "Invalid path segment '{segment}'"
        ))),
    }
}

/// A relative path that stays below its base directory.
fn checked_relative(relative: &str) -> Result<&Path, CoreError> {
    let path = Path::new(relative);
    let valid = !relative.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(path)
    } else {
        Err(CoreError::Validation(format!(
            "Invalid relative path '{relative}'"
        )))
    }
}
