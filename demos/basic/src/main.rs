//! Minimal end-to-end demo.
//!
//! Seeds a couple of job records, enqueues a task per job, and serves the
//! API on localhost. With `REDIS_URL` set the queue, breaker, and cache
//! live in Redis; without it everything runs in process.
//!
//! ```text
//! REDIS_URL=redis://localhost cargo run -p meetq-demo-basic
//! curl -X POST localhost:8080/api/worker/run
//! curl -N localhost:8080/api/jobs/job-1/stream
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use meetq_core::{
    BreakerConfig, CircuitBreaker, HandlerError, JobRecord, JobStatus, JobStore, Keys,
    MemoryJobStore, MemoryStore, ProcessJob, SharedJobStore, SharedStore, Task, TaskKind,
    TaskQueue, WorkerConfig, WorkerLoop,
};
use meetq_redis::RedisStore;
use meetq_server::{Server, ServerConfig};

/// Stands in for the real AI pipeline: walks the job through its
/// processing steps with short pauses, then marks it completed.
struct DemoPipeline {
    jobs: SharedJobStore,
}

#[async_trait]
impl ProcessJob for DemoPipeline {
    async fn process(&self, job_id: &str) -> Result<serde_json::Value, HandlerError> {
        for step in ["transcription", "summary", "action-items"] {
            self.jobs
                .update_status(job_id, JobStatus::Processing, Some(step.to_string()))
                .await
                .map_err(|e| HandlerError::new(e.to_string()))?;
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        self.jobs
            .update_status(job_id, JobStatus::Completed, None)
            .await
            .map_err(|e| HandlerError::new(e.to_string()))?;
        Ok(serde_json::json!({ "jobId": job_id, "summary": "demo summary" }))
    }
}

async fn connect_store() -> SharedStore {
    match std::env::var("REDIS_URL") {
        Ok(url) => match RedisStore::connect(&url).await {
            Ok(store) => {
                tracing::info!(url = %url, "Connected to Redis");
                store
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, using in-process store");
                MemoryStore::shared()
            }
        },
        Err(_) => {
            tracing::warn!("REDIS_URL not set, using in-process store");
            MemoryStore::shared()
        }
    }
}

#[tokio::main]
async fn main() -> meetq_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = connect_store().await;
    let keys = Keys::new("meetq-demo");
    let queue = TaskQueue::new(store.clone(), keys.clone());
    let breaker = CircuitBreaker::new(store, keys, "ai", BreakerConfig::default());

    let jobs = Arc::new(MemoryJobStore::new());
    for id in ["job-1", "job-2"] {
        jobs.insert(JobRecord {
            id: id.to_string(),
            owner_id: "demo-user".to_string(),
            status: JobStatus::Pending,
            processing_step: None,
        })?;
        queue
            .enqueue(&Task::new(TaskKind::ProcessMeetingAi {
                job_id: id.to_string(),
            }))
            .await;
    }

    let jobs: SharedJobStore = jobs;
    let worker = WorkerLoop::new(
        queue.clone(),
        breaker,
        Arc::new(DemoPipeline { jobs: jobs.clone() }),
        WorkerConfig::default(),
    );

    let config = ServerConfig::default();
    Server::new(config, queue, worker, jobs).run().await
}
