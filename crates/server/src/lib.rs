//! # meetq-server - HTTP surface for the task-processing layer
//!
//! Exposes the asynchronous task layer over HTTP:
//!
//! - Producer enqueue (`POST /api/tasks`)
//! - Worker trigger running one bounded pass (`POST /api/worker/run`,
//!   optionally guarded by a bearer-token shared secret)
//! - Dead letter inspection and manual replay (`GET /api/dead`,
//!   `POST /api/dead/{taskId}/replay`)
//! - Job status stream (`GET /api/jobs/{jobId}/stream`), a server-sent
//!   event stream of `{status, processingStep?}` deltas
//! - Health check (`GET /health`) and queue depths (`GET /api/stats`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meetq_core::{
//!     BreakerConfig, CircuitBreaker, Keys, MemoryJobStore, TaskQueue,
//!     WorkerConfig, WorkerLoop,
//! };
//! use meetq_redis::RedisStore;
//! use meetq_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> meetq_core::Result<()> {
//!     let store = RedisStore::connect("redis://localhost").await?;
//!     let keys = Keys::new("myapp");
//!     let queue = TaskQueue::new(store.clone(), keys.clone());
//!     let breaker = CircuitBreaker::new(store, keys, "ai", BreakerConfig::default());
//!     let worker = WorkerLoop::new(queue.clone(), breaker, handler, WorkerConfig::default());
//!
//!     let config = ServerConfig::builder()
//!         .api_addr_str("0.0.0.0:8080")?
//!         .worker_token("secret")
//!         .build();
//!     Server::new(config, queue, worker, MemoryJobStore::shared())
//!         .run()
//!         .await
//! }
//! ```

mod api;
mod config;
mod server;
mod stream;

pub use api::AppState;
pub use config::{ServerConfig, ServerConfigBuilder};
pub use server::Server;
