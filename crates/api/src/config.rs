use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vantage_core::presence::DEFAULT_STALE_WINDOW;
use vantage_core::storage::StorageLayout;
use vantage_worker::pool::DEFAULT_MAX_CONCURRENT;
use vantage_worker::ProcessorConfig;

/// Default upload size limit: 500 MiB.
const DEFAULT_UPLOAD_MAX_BYTES: u64 = 500 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. Malformed
/// numeric values are logged and replaced by their default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Storage root and subdirectory names.
    pub storage: StorageLayout,
    /// Project directory file, relative to the storage root.
    pub projects_filename: String,
    /// Sharing file, relative to the storage root.
    pub sharing_filename: String,
    /// API key file, relative to the storage root.
    pub integrations_filename: String,
    /// Largest accepted upload in bytes.
    pub upload_max_bytes: u64,
    /// Presence entries older than this are dropped.
    pub presence_stale_window: Duration,
    /// Maximum concurrently running processing jobs.
    pub worker_max_concurrent: usize,
    /// Interpreter and script locations for processing jobs.
    pub processor: ProcessorConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                       |
    /// |------------------------------|-------------------------------|
    /// | `HOST`                       | `0.0.0.0`                     |
    /// | `PORT`                       | `3001`                        |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                          |
    /// | `STORAGE_ROOT`               | `./Storage`                   |
    /// | `STORAGE_SUBDIR_RAW`         | `raw`                         |
    /// | `STORAGE_SUBDIR_PROCESSED`   | `processed`                   |
    /// | `STORAGE_SUBDIR_ANNOTATIONS` | `annotations`                 |
    /// | `STORAGE_SUBDIR_CONFIG`      | `config`                      |
    /// | `PROJECTS_FILENAME`          | `projects.json`               |
    /// | `SHARING_FILENAME`           | `sharing.json`                |
    /// | `INTEGRATIONS_FILENAME`      | `integrations.json`           |
    /// | `UPLOAD_MAX_BYTES`           | `524288000`                   |
    /// | `PRESENCE_STALE_MS`          | `20000`                       |
    /// | `WORKER_MAX_CONCURRENT`      | `2`                           |
    /// | `PYTHON_PATH`                | `python3`                     |
    /// | `SCRIPTS_DIR`                | `./scripts`                   |
    /// | `SCRIPT_NAME_MESH`           | `preprocess_meshes.py`        |
    /// | `SCRIPT_NAME_POINTCLOUD`     | `preprocess_pointclouds.py`   |
    /// | `SCRIPT_NAME_GAUSSIAN`       | `generate_gaussian_splats.py` |
    /// | `LOD_DECIMATE_RATIO`         | unset                         |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage = StorageLayout {
            root: PathBuf::from(var("STORAGE_ROOT", "./Storage")),
            raw_subdir: var("STORAGE_SUBDIR_RAW", "raw"),
            processed_subdir: var("STORAGE_SUBDIR_PROCESSED", "processed"),
            annotations_subdir: var("STORAGE_SUBDIR_ANNOTATIONS", "annotations"),
            config_subdir: var("STORAGE_SUBDIR_CONFIG", "config"),
        };

        let defaults = ProcessorConfig::default();
        let processor = ProcessorConfig {
            interpreter: var("PYTHON_PATH", &defaults.interpreter),
            scripts_dir: PathBuf::from(var("SCRIPTS_DIR", "./scripts")),
            mesh_script: var("SCRIPT_NAME_MESH", &defaults.mesh_script),
            pointcloud_script: var("SCRIPT_NAME_POINTCLOUD", &defaults.pointcloud_script),
            gaussian_script: var("SCRIPT_NAME_GAUSSIAN", &defaults.gaussian_script),
            decimate_ratio: ProcessorConfig::parse_decimate_ratio(
                lookup("LOD_DECIMATE_RATIO").as_deref(),
            ),
        };

        Self {
            host: var("HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 3001),
            cors_origins,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30),
            storage,
            projects_filename: var("PROJECTS_FILENAME", "projects.json"),
            sharing_filename: var("SHARING_FILENAME", "sharing.json"),
            integrations_filename: var("INTEGRATIONS_FILENAME", "integrations.json"),
            upload_max_bytes: parse_or(&lookup, "UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
            presence_stale_window: Duration::from_millis(parse_or(
                &lookup,
                "PRESENCE_STALE_MS",
                DEFAULT_STALE_WINDOW.as_millis() as u64,
            )),
            worker_max_concurrent: parse_or(&lookup, "WORKER_MAX_CONCURRENT", DEFAULT_MAX_CONCURRENT)
                .max(1),
            processor,
        }
    }
}

/// Parse a numeric variable, falling back to `default` when unset or malformed.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Malformed numeric setting, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.storage.root, PathBuf::from("./Storage"));
        assert_eq!(config.storage.processed_subdir, "processed");
        assert_eq!(config.upload_max_bytes, 500 * 1024 * 1024);
        assert_eq!(config.presence_stale_window, Duration::from_millis(20_000));
        assert_eq!(config.worker_max_concurrent, 2);
        assert_eq!(config.processor.interpreter, "python3");
        assert_eq!(config.processor.mesh_script, "preprocess_meshes.py");
        assert_eq!(config.processor.pointcloud_script, "preprocess_pointclouds.py");
        assert_eq!(config.processor.gaussian_script, "generate_gaussian_splats.py");
        assert_eq!(config.processor.decimate_ratio, None);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("STORAGE_ROOT", "/srv/vantage"),
            ("WORKER_MAX_CONCURRENT", "6"),
            ("PRESENCE_STALE_MS", "5000"),
            ("PYTHON_PATH", "/usr/bin/python3.12"),
            ("LOD_DECIMATE_RATIO", "0.4"),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.storage.root, PathBuf::from("/srv/vantage"));
        assert_eq!(config.worker_max_concurrent, 6);
        assert_eq!(config.presence_stale_window, Duration::from_millis(5000));
        assert_eq!(config.processor.interpreter, "/usr/bin/python3.12");
        assert_eq!(config.processor.decimate_ratio, Some(0.4));
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("UPLOAD_MAX_BYTES", "-1"),
            ("WORKER_MAX_CONCURRENT", "many"),
            ("LOD_DECIMATE_RATIO", "2.0"),
        ]);

        assert_eq!(config.port, 3001);
        assert_eq!(config.upload_max_bytes, 500 * 1024 * 1024);
        assert_eq!(config.worker_max_concurrent, 2);
        assert_eq!(config.processor.decimate_ratio, None);
    }

    #[test]
    fn zero_concurrency_is_raised_to_one() {
        let config = config_from(&[("WORKER_MAX_CONCURRENT", "0")]);
        assert_eq!(config.worker_max_concurrent, 1);
    }
}
