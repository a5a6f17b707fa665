//! API handlers for the meetq server.

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use meetq_core::{SharedJobStore, Task, TaskKind, TaskQueue, WorkerLoop};

use crate::config::ServerConfig;
use crate::stream;

/// Application state shared across handlers.
pub struct AppState {
    pub queue: TaskQueue,
    pub worker: WorkerLoop,
    pub jobs: SharedJobStore,
    pub config: ServerConfig,
}

/// Response for health check.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Response for queue statistics.
#[derive(Serialize)]
pub struct StatsResponse {
    pub queue: usize,
    pub dead: usize,
}

/// Request body for enqueueing a task. The id is caller-assigned when
/// present; the kind/payload use the task wire shape (`type` + `data`).
#[derive(Deserialize)]
pub struct EnqueueRequest {
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
}

/// Response for enqueue operation.
#[derive(Serialize)]
pub struct EnqueueResponse {
    pub success: bool,
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Generic API response.
#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

/// Query parameters for the dead letter list.
#[derive(Deserialize)]
pub struct DeadListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Response for listing dead letter entries.
#[derive(Serialize)]
pub struct DeadListResponse {
    pub entries: Vec<meetq_core::DeadLetterEntry>,
    pub total: usize,
}

/// Configure API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .route("/health", web::get().to(health))
            .service(
                web::scope("/api")
                    .route("/stats", web::get().to(stats))
                    .route("/tasks", web::post().to(enqueue))
                    .route("/worker/run", web::post().to(run_worker))
                    .route("/dead", web::get().to(list_dead))
                    .route("/dead/{taskId}/replay", web::post().to(replay_dead))
                    .route("/jobs/{jobId}/stream", web::get().to(stream::stream_job)),
            ),
    );
}

/// Check a bearer token against the configured shared secret.
/// No configured secret leaves the endpoint open.
pub(crate) fn authorized(req: &HttpRequest, token: &Option<String>) -> bool {
    let Some(token) = token else {
        return true;
    };
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|presented| presented == token)
        .unwrap_or(false)
}

/// Health check endpoint.
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}

/// Get queue and dead letter depths.
async fn stats(state: web::Data<AppState>) -> impl Responder {
    let queue = state.queue.len().await.unwrap_or(0);
    let dead = state.queue.dlq_len().await.unwrap_or(0);
    HttpResponse::Ok().json(StatsResponse { queue, dead })
}

/// Enqueue a new task.
async fn enqueue(state: web::Data<AppState>, body: web::Json<EnqueueRequest>) -> impl Responder {
    let body = body.into_inner();
    let task = match body.id {
        Some(id) => Task::with_id(id, body.kind),
        None => Task::new(body.kind),
    };

    if state.queue.enqueue(&task).await {
        HttpResponse::Ok().json(EnqueueResponse {
            success: true,
            task_id: Some(task.id.0),
        })
    } else {
        HttpResponse::InternalServerError().json(EnqueueResponse {
            success: false,
            task_id: None,
        })
    }
}

/// Run exactly one bounded worker pass.
///
/// Triggered externally (cron, manual call); the loop holds no state across
/// invocations besides what is in the queue/DLQ.
async fn run_worker(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if !authorized(&req, &state.config.worker_token) {
        return HttpResponse::Unauthorized().json(ApiResponse {
            success: false,
            message: "unauthorized".to_string(),
        });
    }

    match state.worker.run_once().await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            tracing::error!(error = %e, "Worker pass failed");
            HttpResponse::InternalServerError().json(ApiResponse {
                success: false,
                message: "worker pass failed".to_string(),
            })
        }
    }
}

/// List dead letter entries.
async fn list_dead(state: web::Data<AppState>, query: web::Query<DeadListQuery>) -> impl Responder {
    let total = state.queue.dlq_len().await.unwrap_or(0);
    match state.queue.list_dlq(query.limit, query.offset).await {
        Ok(entries) => HttpResponse::Ok().json(DeadListResponse { entries, total }),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list dead letter entries");
            HttpResponse::InternalServerError().json(ApiResponse {
                success: false,
                message: "failed to list dead letter entries".to_string(),
            })
        }
    }
}

/// Manually replay a dead letter entry by task id.
async fn replay_dead(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let task_id = path.into_inner();
    match state.queue.replay_dlq(&task_id).await {
        Ok(true) => HttpResponse::Ok().json(ApiResponse {
            success: true,
            message: format!("task {} re-enqueued", task_id),
        }),
        Ok(false) => HttpResponse::NotFound().json(ApiResponse {
            success: false,
            message: format!("dead letter entry for task {} not found", task_id),
        }),
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to replay dead letter entry");
            HttpResponse::InternalServerError().json(ApiResponse {
                success: false,
                message: "failed to replay dead letter entry".to_string(),
            })
        }
    }
}
