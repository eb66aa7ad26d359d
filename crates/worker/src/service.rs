use std::sync::Arc;

use vantage_core::jobs::{Job, JobPayload, JobType};
use vantage_core::storage::FileStorage;
use vantage_core::types::JobId;

use crate::pool::WorkerPool;
use crate::processor::{JobProcessor, ProcessorConfig};
use crate::queue::JobQueue;

/// Entry point used by request handlers: record a job and schedule it.
pub struct ProcessingService {
    queue: Arc<JobQueue>,
    pool: WorkerPool,
    processor: Arc<JobProcessor>,
}

impl ProcessingService {
    /// Build the job table, processor and pool. Must be called from within
    /// a Tokio runtime.
    pub fn start(storage: FileStorage, config: ProcessorConfig, max_concurrent: usize) -> Self {
        let queue = Arc::new(JobQueue::new());
        let processor = Arc::new(JobProcessor::new(Arc::clone(&queue), storage, config));
        Self {
            queue,
            pool: WorkerPool::start(max_concurrent),
            processor,
        }
    }

    /// Enqueue a job and hand it to the pool. Returns the `queued` snapshot.
    pub async fn submit(&self, job_type: JobType, payload: JobPayload) -> Job {
        let job = self.queue.enqueue(job_type, payload).await;

        let processor = Arc::clone(&self.processor);
        let job_id = job.id;
        let payload = job.payload.clone();
        self.pool.submit(async move {
            processor.process(job_id, job_type, &payload).await;
        });
        job
    }

    pub async fn status(&self, job_id: JobId) -> Option<Job> {
        self.queue.get(job_id).await
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Stop taking new work and wait for running jobs.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use vantage_core::jobs::JobStatus;
    use vantage_core::storage::StorageLayout;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn submitted_jobs_run_with_bounded_concurrency() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("Storage");
        let scripts = tmp.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("mesh.sh"), "sleep 0.1\n").unwrap();
        std::fs::create_dir_all(root.join("raw/P1/Meshes")).unwrap();
        std::fs::write(root.join("raw/P1/Meshes/a.obj"), b"v").unwrap();

        let service = ProcessingService::start(
            FileStorage::new(StorageLayout::with_root(&root)),
            ProcessorConfig {
                interpreter: "sh".into(),
                scripts_dir: scripts,
                mesh_script: "mesh.sh".into(),
                ..ProcessorConfig::default()
            },
            2,
        );

        let mut ids = Vec::new();
        for _ in 0..5 {
            let job = service
                .submit(
                    JobType::Mesh,
                    JobPayload {
                        project_id: "P1".into(),
                        file_path: "Meshes/a.obj".into(),
                    },
                )
                .await;
            assert_eq!(job.status, JobStatus::Queued);
            ids.push(job.id);
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
        loop {
            let processing = service.queue().count_with_status(JobStatus::Processing).await;
            assert!(processing <= 2, "{processing} jobs processing at once");
            if service.queue().count_with_status(JobStatus::Completed).await == 5 {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "jobs did not finish");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        for id in ids {
            assert_eq!(service.status(id).await.unwrap().status, JobStatus::Completed);
        }
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let service = ProcessingService::start(
            FileStorage::new(StorageLayout::with_root(tmp.path())),
            ProcessorConfig::default(),
            1,
        );
        assert!(service.status(uuid::Uuid::new_v4()).await.is_none());
    }
}
