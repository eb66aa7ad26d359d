//! Volatile job table.
//!
//! Jobs live for the lifetime of the process and are never deleted. Status
//! updates for ids the table does not know are silently ignored: execution
//! is decoupled from dispatch and must tolerate a missing record.

use std::collections::HashMap;

use tokio::sync::RwLock;
use vantage_core::jobs::{Job, JobPayload, JobResult, JobStatus, JobType};
use vantage_core::types::JobId;

pub struct JobQueue {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Record a new `queued` job. Payload contents are not validated.
    pub async fn enqueue(&self, job_type: JobType, payload: JobPayload) -> Job {
        let job = Job::new(job_type, payload);
        self.jobs.write().await.insert(job.id, job.clone());

        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            project_id = %job.payload.project_id,
            "Job queued",
        );
        job
    }

    /// Snapshot of a job, or `None` if the id is unknown.
    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Move a job to `status`, optionally recording a result.
    ///
    /// Returns `None` for unknown ids. Transitions that would move a job
    /// backwards, or from one terminal state to the other, leave the job
    /// untouched and return its current snapshot.
    pub async fn update_status(
        &self,
        job_id: JobId,
        status: JobStatus,
        result: Option<JobResult>,
    ) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            tracing::debug!(job_id = %job_id, status = %status, "Status update for unknown job ignored");
            return None;
        };

        if !job.status.can_transition_to(status) {
            tracing::warn!(
                job_id = %job_id,
                from = %job.status,
                to = %status,
                "Rejected job status transition",
            );
            return Some(job.clone());
        }

        job.status = status;
        if result.is_some() {
            job.result = result;
        }
        job.updated_at = chrono::Utc::now();

        match status {
            JobStatus::Failed => tracing::warn!(job_id = %job_id, result = ?job.result, "Job failed"),
            _ => tracing::info!(job_id = %job_id, status = %status, "Job status updated"),
        }
        Some(job.clone())
    }

    /// Number of jobs recorded since startup.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Number of jobs currently in `status`.
    pub async fn count_with_status(&self, status: JobStatus) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| j.status == status)
            .count()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
