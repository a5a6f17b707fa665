//! Timeboxed worker dispatch loop.
//!
//! Each invocation is an independent, bounded pass: it dequeues up to
//! `max_tasks` tasks within `max_duration`, dispatches each through the
//! circuit breaker, re-enqueues retryable failures at the tail with an
//! incremented retry count, and dead-letters tasks past the retry budget.
//! A single task's failure never aborts the batch.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::breaker::{BreakerError, CircuitBreaker};
use crate::config::WorkerConfig;
use crate::error::{MeetqError, Result};
use crate::queue::TaskQueue;
use crate::task::{Task, TaskKind};

/// Error returned from the AI-pipeline handler.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Error message; this is what reaches the DLQ reason.
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The externally-supplied AI-pipeline handler.
///
/// The worker does not know or care what this does internally; it only
/// observes success, failure, and latency.
#[async_trait]
pub trait ProcessJob: Send + Sync {
    /// Process one job end to end.
    async fn process(&self, job_id: &str) -> std::result::Result<serde_json::Value, HandlerError>;
}

/// A type-erased handler handle.
pub type SharedHandler = Arc<dyn ProcessJob>;

/// Per-task result of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    fn success(task_id: String, result: serde_json::Value) -> Self {
        Self {
            task_id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(task_id: String, error: String) -> Self {
        Self {
            task_id,
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

/// Summary of one worker pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    #[serde(rename = "processedCount")]
    pub processed_count: usize,
    pub results: Vec<TaskOutcome>,
}

/// The worker dispatch loop.
#[derive(Clone)]
pub struct WorkerLoop {
    queue: TaskQueue,
    breaker: CircuitBreaker,
    handler: SharedHandler,
    config: WorkerConfig,
}

impl WorkerLoop {
    /// Create a worker over a queue, a breaker, and a handler.
    pub fn new(
        queue: TaskQueue,
        breaker: CircuitBreaker,
        handler: SharedHandler,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            breaker,
            handler,
            config,
        }
    }

    /// Run exactly one bounded pass.
    ///
    /// Stops when the queue is empty, the task budget is spent, or the time
    /// budget is exceeded (remaining tasks are left for the next
    /// invocation). The result list records a failure for every failed
    /// dispatch regardless of whether a retry was scheduled.
    pub async fn run_once(&self) -> Result<PassSummary> {
        let started = Instant::now();
        let mut results = Vec::new();

        while results.len() < self.config.max_tasks {
            if started.elapsed() >= self.config.max_duration {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Worker pass time budget exceeded, deferring remaining tasks"
                );
                break;
            }

            let task = match self.queue.dequeue().await {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(MeetqError::UnknownTask { id, detail }) => {
                    // Recorded as failed, never requeued.
                    tracing::error!(task_id = %id, error = %detail, "Dropping unrecognized task");
                    results.push(TaskOutcome::failure(id, detail));
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.dispatch(&task).await {
                Ok(result) => {
                    tracing::info!(task_id = %task.id, kind = task.kind.name(), "Task processed");
                    results.push(TaskOutcome::success(task.id.0.clone(), result));
                }
                Err(message) => {
                    tracing::warn!(
                        task_id = %task.id,
                        retries = task.retries,
                        error = %message,
                        "Task failed"
                    );
                    if task.retries < self.config.max_retries {
                        let mut retry = task.clone();
                        retry.retries += 1;
                        // FIFO tail requeue: the failing task cycles behind
                        // previously queued work.
                        if !self.queue.enqueue(&retry).await {
                            tracing::error!(task_id = %task.id, "Failed to re-enqueue task");
                        }
                    } else if let Err(e) = self.queue.enqueue_dlq(&task, &message).await {
                        tracing::error!(task_id = %task.id, error = %e, "Failed to dead-letter task");
                    }
                    results.push(TaskOutcome::failure(task.id.0.clone(), message));
                }
            }
        }

        Ok(PassSummary {
            processed_count: results.len(),
            results,
        })
    }

    /// Dispatch one task to its handler through the circuit breaker.
    ///
    /// Every failure is treated as retryable by the caller; a circuit-open
    /// rejection is surfaced as an ordinary task failure.
    async fn dispatch(&self, task: &Task) -> std::result::Result<serde_json::Value, String> {
        match &task.kind {
            TaskKind::ProcessMeetingAi { job_id } => {
                match self.breaker.execute(|| self.handler.process(job_id)).await {
                    Ok(result) => Ok(result),
                    Err(err @ BreakerError::Open(_)) => Err(err.to_string()),
                    Err(BreakerError::Service(err)) => Err(err.message),
                }
            }
        }
    }
}
