//! Job processing recipes.
//!
//! Every job type follows the same recipe: resolve the input under the
//! project's raw directory, create the processed output directory for the
//! type's category, then run the configured conversion script through the
//! interpreter as `<interpreter> <script> <input> -o <output_dir> [extra]`.
//! The outcome is always written back to the job; [`JobProcessor::process`]
//! never returns an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::Command;
use vantage_core::error::CoreError;
use vantage_core::jobs::{JobPayload, JobResult, JobStatus, JobType};
use vantage_core::storage::FileStorage;
use vantage_core::subprocess::{run_command, ProcessError, ProcessOutput};
use vantage_core::types::JobId;

use crate::queue::JobQueue;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How conversion scripts are located and invoked.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Interpreter used to run every script (e.g. `python3`).
    pub interpreter: String,
    /// Directory holding the scripts. Its parent is the working directory.
    pub scripts_dir: PathBuf,
    pub mesh_script: String,
    pub pointcloud_script: String,
    pub gaussian_script: String,
    /// Passed to the mesh script as `--decimate-ratio` when set.
    pub decimate_ratio: Option<f64>,
}

impl ProcessorConfig {
    /// Script file name for a job type.
    pub fn script_for(&self, job_type: JobType) -> &str {
        match job_type {
            JobType::Mesh => &self.mesh_script,
            JobType::PointCloud => &self.pointcloud_script,
            JobType::GaussianSplat => &self.gaussian_script,
        }
    }

    /// Parse a decimation ratio. Only values strictly between 0 and 1 are
    /// kept; anything else disables decimation.
    pub fn parse_decimate_ratio(raw: Option<&str>) -> Option<f64> {
        raw.and_then(|r| r.trim().parse::<f64>().ok())
            .filter(|r| *r > 0.0 && *r < 1.0)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            scripts_dir: PathBuf::from("scripts"),
            mesh_script: "preprocess_meshes.py".into(),
            pointcloud_script: "preprocess_pointclouds.py".into(),
            gaussian_script: "generate_gaussian_splats.py".into(),
            decimate_ratio: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Why a job ended in `failed`. The display text is stored as the job's
/// error message.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error("{0}")]
    InvalidPath(CoreError),

    #[error("{0}")]
    OutputDir(CoreError),

    #[error("Input file not found")]
    InputMissing,

    #[error("{0}")]
    Spawn(ProcessError),

    #[error("{}", exit_message(.0))]
    Exit(ProcessOutput),
}

/// Failure text for a script that exited non-zero: trimmed stderr, else the
/// exit code.
fn exit_message(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match output.exit_code {
        Some(code) => format!("Exit code {code}"),
        None => "Script failed".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

pub struct JobProcessor {
    queue: Arc<JobQueue>,
    storage: FileStorage,
    config: ProcessorConfig,
}

impl JobProcessor {
    pub fn new(queue: Arc<JobQueue>, storage: FileStorage, config: ProcessorConfig) -> Self {
        Self {
            queue,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run one job to a terminal state.
    pub async fn process(&self, job_id: JobId, job_type: JobType, payload: &JobPayload) {
        self.queue
            .update_status(job_id, JobStatus::Processing, None)
            .await;

        match self.execute(job_type, payload).await {
            Ok(output_dir) => {
                tracing::info!(
                    job_id = %job_id,
                    job_type = %job_type,
                    output_dir = %output_dir.display(),
                    "Processing finished",
                );
                self.queue
                    .update_status(
                        job_id,
                        JobStatus::Completed,
                        Some(JobResult::output(output_dir.to_string_lossy())),
                    )
                    .await;
            }
            Err(failure) => {
                tracing::warn!(
                    job_id = %job_id,
                    job_type = %job_type,
                    error = %failure,
                    "Processing failed",
                );
                self.queue
                    .update_status(
                        job_id,
                        JobStatus::Failed,
                        Some(JobResult::error(failure.to_string())),
                    )
                    .await;
            }
        }
    }

    async fn execute(&self, job_type: JobType, payload: &JobPayload) -> Result<PathBuf, JobFailure> {
        let input = self
            .storage
            .raw_file_path(&payload.project_id, &payload.file_path)
            .map_err(JobFailure::InvalidPath)?;
        let output_dir = self
            .storage
            .processed_dir(&payload.project_id, job_type.output_category())
            .await
            .map_err(JobFailure::OutputDir)?;

        if !matches!(tokio::fs::try_exists(&input).await, Ok(true)) {
            return Err(JobFailure::InputMissing);
        }

        let mut cmd = self.build_command(job_type, &input, &output_dir);
        let output = run_command(&mut cmd).await.map_err(JobFailure::Spawn)?;
        tracing::debug!(
            job_type = %job_type,
            exit_code = ?output.exit_code,
            duration_ms = output.duration_ms,
            "Conversion script exited",
        );

        if output.success() {
            Ok(output_dir)
        } else {
            Err(JobFailure::Exit(output))
        }
    }

    fn build_command(&self, job_type: JobType, input: &Path, output_dir: &Path) -> Command {
        let script = self.config.scripts_dir.join(self.config.script_for(job_type));

        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(&script).arg(input).arg("-o").arg(output_dir);

        if job_type == JobType::Mesh {
            if let Some(ratio) = self.config.decimate_ratio {
                cmd.arg("--decimate-ratio").arg(ratio.to_string());
            }
        }

        if let Some(parent) = self
            .config
            .scripts_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            cmd.current_dir(parent);
        }
        cmd
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
