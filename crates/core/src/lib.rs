//! # meetq-core - Async task processing and resilience layer
//!
//! Core building blocks for processing long-running AI jobs without
//! blocking request/response cycles:
//!
//! - **Durable FIFO task queue** with a dead letter queue for tasks that
//!   exhaust their retry budget
//! - **Timeboxed worker loop** with per-pass task/time budgets and tail
//!   re-enqueue on failure (at-least-once, never exactly-once)
//! - **Circuit breaker** over shared storage protecting a flaky downstream
//!   AI service
//! - **Backoff-retry primitive** with exponential delay and jitter
//! - **Stale-while-revalidate cache** with detached background refresh
//!
//! Everything stateful lives behind the [`Store`](store::Store) trait so
//! multiple service instances observe the same queue, breaker, and cache.
//! [`MemoryStore`](store::MemoryStore) backs tests, demos, and the degraded
//! credential-less mode; `meetq-redis` provides the production backend.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meetq_core::{
//!     BreakerConfig, CircuitBreaker, HandlerError, Keys, MemoryStore,
//!     ProcessJob, Task, TaskKind, TaskQueue, WorkerConfig, WorkerLoop,
//! };
//!
//! struct AiPipeline;
//!
//! #[async_trait::async_trait]
//! impl ProcessJob for AiPipeline {
//!     async fn process(&self, job_id: &str) -> Result<serde_json::Value, HandlerError> {
//!         Ok(serde_json::json!({ "jobId": job_id }))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> meetq_core::Result<()> {
//!     let store = MemoryStore::shared();
//!     let keys = Keys::new("myapp");
//!     let queue = TaskQueue::new(store.clone(), keys.clone());
//!     let breaker = CircuitBreaker::new(store, keys, "ai", BreakerConfig::default());
//!     let worker = WorkerLoop::new(
//!         queue.clone(),
//!         breaker,
//!         Arc::new(AiPipeline),
//!         WorkerConfig::default(),
//!     );
//!
//!     queue
//!         .enqueue(&Task::new(TaskKind::ProcessMeetingAi { job_id: "j1".into() }))
//!         .await;
//!     let summary = worker.run_once().await?;
//!     println!("processed {}", summary.processed_count);
//!     Ok(())
//! }
//! ```

pub mod breaker;
pub mod cache;
pub mod config;
pub mod error;
pub mod jobs;
pub mod keys;
pub mod queue;
pub mod retry;
pub mod store;
pub mod task;
pub mod worker;

// Re-export main types
pub use breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker};
pub use cache::Cache;
pub use config::{WorkerConfig, WorkerConfigBuilder};
pub use error::{MeetqError, Result};
pub use jobs::{JobRecord, JobStatus, JobStore, MemoryJobStore, SharedJobStore};
pub use keys::Keys;
pub use queue::TaskQueue;
pub use retry::{RetryOptions, RetryPredicate};
pub use store::{MemoryStore, SharedStore, Store};
pub use task::{DeadLetterEntry, Task, TaskId, TaskKind};
pub use worker::{
    HandlerError, PassSummary, ProcessJob, SharedHandler, TaskOutcome, WorkerLoop,
};
