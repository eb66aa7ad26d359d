//! Processing job model.
//!
//! A [`Job`] is one unit of asynchronous asset-processing work. Jobs are
//! created `queued`, move to `processing` when a worker slot picks them up,
//! and end in exactly one terminal state (`completed` or `failed`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, ProjectId, Timestamp};

// ---------------------------------------------------------------------------
// Job type
// ---------------------------------------------------------------------------

/// The kind of processing a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "mesh")]
    Mesh,
    #[serde(rename = "pointcloud")]
    PointCloud,
    #[serde(rename = "gaussian-splat")]
    GaussianSplat,
}

impl JobType {
    /// All job types, in declaration order.
    pub const ALL: [JobType; 3] = [JobType::Mesh, JobType::PointCloud, JobType::GaussianSplat];

    /// Wire name used in URLs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Mesh => "mesh",
            JobType::PointCloud => "pointcloud",
            JobType::GaussianSplat => "gaussian-splat",
        }
    }

    /// Processed-output category directory for this job type.
    pub fn output_category(self) -> &'static str {
        match self {
            JobType::Mesh => "Meshes",
            JobType::PointCloud => "PointClouds",
            JobType::GaussianSplat => "Splats",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown job type '{s}'. Must be one of: mesh, pointcloud, gaussian-splat"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the lifecycle. Terminal states share the last rank.
    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Returns `true` for `completed` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job in `self` may be updated to `next`.
    ///
    /// Forward moves are allowed, as is re-applying the current status.
    /// Backward moves and switching between the two terminal states are not.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self == next || next.rank() > self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Payload and result
// ---------------------------------------------------------------------------

/// What a job operates on: a file relative to the project's raw directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub project_id: ProjectId,
    pub file_path: String,
}

/// Outcome recorded on a job once it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    Output {
        #[serde(rename = "outputDir")]
        output_dir: String,
    },
    Error { error: String },
}

impl JobResult {
    pub fn output(output_dir: impl Into<String>) -> Self {
        JobResult::Output {
            output_dir: output_dir.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        JobResult::Error {
            error: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A snapshot of one job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub payload: JobPayload,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Build a fresh `queued` job with a random id.
    pub fn new(job_type: JobType, payload: JobPayload) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            job_type,
            payload,
            status: JobStatus::Queued,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> JobPayload {
        JobPayload {
            project_id: "p1".into(),
            file_path: "Meshes/chair.obj".into(),
        }
    }

    #[test]
    fn job_type_round_trips_through_str() {
        for t in JobType::ALL {
            assert_eq!(t.as_str().parse::<JobType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_job_type_is_validation_error() {
        let err = "voxel".parse::<JobType>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn output_categories() {
        assert_eq!(JobType::Mesh.output_category(), "Meshes");
        assert_eq!(JobType::PointCloud.output_category(), "PointClouds");
        assert_eq!(JobType::GaussianSplat.output_category(), "Splats");
    }

    #[test]
    fn forward_transitions_allowed() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn reapplying_terminal_status_is_allowed() {
        assert!(JobStatus::Completed.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Failed.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn backward_and_cross_terminal_transitions_rejected() {
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn job_serializes_with_wire_field_names() {
        let mut job = Job::new(JobType::GaussianSplat, payload());
        job.result = Some(JobResult::output("/data/processed/p1/Splats"));
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["type"], "gaussian-splat");
        assert_eq!(json["status"], "queued");
        assert_eq!(json["payload"]["projectId"], "p1");
        assert_eq!(json["payload"]["filePath"], "Meshes/chair.obj");
        assert_eq!(json["result"]["outputDir"], "/data/processed/p1/Splats");
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_string());
    }

    #[test]
    fn new_job_omits_result() {
        let job = Job::new(JobType::Mesh, payload());
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("result").is_none());
    }

    #[test]
    fn error_result_serializes_as_error_field() {
        let json = serde_json::to_value(JobResult::error("Input file not found")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Input file not found"}));
    }
}
