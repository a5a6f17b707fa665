//! Server implementation binding the API surface.

use actix_web::{web, App, HttpServer};

use meetq_core::{MeetqError, Result, SharedJobStore, TaskQueue, WorkerLoop};

use crate::api::{self, AppState};
use crate::config::ServerConfig;

/// The meetq HTTP server.
///
/// Serves the producer enqueue endpoint, the worker trigger, DLQ
/// inspection/replay, and the job status stream. The worker itself runs
/// only when triggered; the server holds no background loops.
pub struct Server {
    config: ServerConfig,
    queue: TaskQueue,
    worker: WorkerLoop,
    jobs: SharedJobStore,
}

impl Server {
    /// Create a new server.
    pub fn new(
        config: ServerConfig,
        queue: TaskQueue,
        worker: WorkerLoop,
        jobs: SharedJobStore,
    ) -> Self {
        Self {
            config,
            queue,
            worker,
            jobs,
        }
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.api_addr;
        let data = web::Data::new(AppState {
            queue: self.queue,
            worker: self.worker,
            jobs: self.jobs,
            config: self.config,
        });

        tracing::info!(addr = %addr, "API server listening");

        HttpServer::new(move || App::new().app_data(data.clone()).configure(api::configure))
            .bind(addr)
            .map_err(|e| MeetqError::Config(format!("failed to bind {}: {}", addr, e)))?
            .run()
            .await
            .map_err(|e| MeetqError::Config(format!("server error: {}", e)))
    }
}
