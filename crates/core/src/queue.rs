//! Durable FIFO task queue and dead letter queue.
//!
//! The queue holds serialized tasks in a store list; head removal is atomic,
//! so two concurrent workers never receive the same task. Retry policy lives
//! with the worker, not here: the queue stores whatever `retries` value the
//! caller passed on re-enqueue.

use crate::error::{MeetqError, Result};
use crate::keys::Keys;
use crate::store::SharedStore;
use crate::task::{now_ms, DeadLetterEntry, Task};

/// Durable task queue over the shared store.
#[derive(Clone)]
pub struct TaskQueue {
    store: SharedStore,
    keys: Keys,
}

impl TaskQueue {
    /// Create a queue over the shared store.
    pub fn new(store: SharedStore, keys: Keys) -> Self {
        Self { store, keys }
    }

    /// Append a task to the tail of the queue.
    ///
    /// Returns whether the append succeeded; a store failure logs and
    /// returns `false` rather than raising.
    pub async fn enqueue(&self, task: &Task) -> bool {
        let json = match task.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(task_id = %task.id, error = %e, "Failed to serialize task");
                return false;
            }
        };
        match self.store.push_back(&self.keys.tasks(), &json).await {
            Ok(()) => {
                tracing::debug!(
                    task_id = %task.id,
                    kind = task.kind.name(),
                    retries = task.retries,
                    "Task enqueued"
                );
                true
            }
            Err(e) => {
                tracing::error!(task_id = %task.id, error = %e, "Failed to enqueue task");
                false
            }
        }
    }

    /// Atomically remove and return the head of the queue, or `None` when
    /// empty. Never blocks.
    ///
    /// A payload that no longer parses as a known task kind has already been
    /// removed from the list when this returns
    /// [`MeetqError::UnknownTask`]; callers record the failure and move on.
    pub async fn dequeue(&self) -> Result<Option<Task>> {
        let raw = self.store.pop_front(&self.keys.tasks()).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match Task::from_json(&raw) {
            Ok(task) => Ok(Some(task)),
            Err(e) => {
                let id = serde_json::from_str::<serde_json::Value>(&raw)
                    .ok()
                    .and_then(|v| v.get("id").and_then(|i| i.as_str()).map(String::from))
                    .unwrap_or_else(|| "unknown".to_string());
                Err(MeetqError::UnknownTask {
                    id,
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Append a dead letter entry for a task that exhausted its retry
    /// budget. Dead letters are never automatically re-processed.
    pub async fn enqueue_dlq(&self, task: &Task, reason: &str) -> Result<()> {
        let entry = DeadLetterEntry {
            task: task.clone(),
            reason: reason.to_string(),
            moved_at: now_ms(),
        };
        let json = serde_json::to_string(&entry)?;
        self.store.push_back(&self.keys.dead(), &json).await?;
        tracing::warn!(task_id = %entry.task.id, reason, "Task moved to dead letter queue");
        Ok(())
    }

    /// Number of pending tasks.
    pub async fn len(&self) -> Result<usize> {
        self.store.list_len(&self.keys.tasks()).await
    }

    /// Whether the queue has no pending tasks.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Number of dead letter entries.
    pub async fn dlq_len(&self) -> Result<usize> {
        self.store.list_len(&self.keys.dead()).await
    }

    /// List dead letter entries with pagination. Entries that no longer
    /// parse are skipped.
    pub async fn list_dlq(&self, limit: usize, offset: usize) -> Result<Vec<DeadLetterEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = (offset + limit - 1) as isize;
        let raws = self
            .store
            .list_range(&self.keys.dead(), offset as isize, stop)
            .await?;
        Ok(raws
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect())
    }

    /// Manually replay a dead letter entry: remove it from the DLQ and
    /// re-enqueue its task with a fresh retry budget. Returns whether an
    /// entry with the given task id was found.
    pub async fn replay_dlq(&self, task_id: &str) -> Result<bool> {
        let raws = self.store.list_range(&self.keys.dead(), 0, -1).await?;
        for raw in raws {
            let Ok(entry) = serde_json::from_str::<DeadLetterEntry>(&raw) else {
                continue;
            };
            if entry.task.id.0 != task_id {
                continue;
            }
            self.store.list_remove(&self.keys.dead(), &raw).await?;
            let mut task = entry.task;
            task.retries = 0;
            tracing::info!(task_id = %task.id, "Replaying dead letter task");
            return Ok(self.enqueue(&task).await);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::task::TaskKind;

    fn queue() -> TaskQueue {
        TaskQueue::new(MemoryStore::shared(), Keys::new("test"))
    }

    fn task(id: &str, job_id: &str) -> Task {
        Task::with_id(
            id,
            TaskKind::ProcessMeetingAi {
                job_id: job_id.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_fifo_order_preserved() {
        let queue = queue();
        for i in 0..5 {
            assert!(queue.enqueue(&task(&format!("t{}", i), "j")).await);
        }
        for i in 0..5 {
            let dequeued = queue.dequeue().await.unwrap().unwrap();
            assert_eq!(dequeued.id.0, format!("t{}", i));
        }
        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dequeue_empty_returns_none() {
        let queue = queue();
        assert!(queue.dequeue().await.unwrap().is_none());
        assert_eq!(queue.len().await.unwrap(), 0);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_dlq_roundtrip() {
        let queue = queue();
        let t = task("t1", "j1");
        queue.enqueue_dlq(&t, "handler exploded").await.unwrap();

        assert_eq!(queue.dlq_len().await.unwrap(), 1);
        let entries = queue.list_dlq(10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task.id.0, "t1");
        assert_eq!(entries[0].reason, "handler exploded");
        assert!(entries[0].moved_at > 0);
    }

    #[tokio::test]
    async fn test_dlq_pagination() {
        let queue = queue();
        for i in 0..5 {
            queue
                .enqueue_dlq(&task(&format!("t{}", i), "j"), "failed")
                .await
                .unwrap();
        }
        let entries = queue.list_dlq(2, 1).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].task.id.0, "t1");
        assert_eq!(entries[1].task.id.0, "t2");
    }

    #[tokio::test]
    async fn test_replay_dlq() {
        let queue = queue();
        let mut t = task("t1", "j1");
        t.retries = 3;
        queue.enqueue_dlq(&t, "failed").await.unwrap();

        assert!(queue.replay_dlq("t1").await.unwrap());
        assert_eq!(queue.dlq_len().await.unwrap(), 0);

        let replayed = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(replayed.id.0, "t1");
        assert_eq!(replayed.retries, 0);

        assert!(!queue.replay_dlq("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_removed_and_reported() {
        let store = MemoryStore::shared();
        let keys = Keys::new("test");
        let queue = TaskQueue::new(store.clone(), keys.clone());

        store
            .push_back(&keys.tasks(), r#"{"id":"bad","type":"NOT_A_KIND","data":{},"retries":0}"#)
            .await
            .unwrap();
        queue.enqueue(&task("t1", "j1")).await;

        let err = queue.dequeue().await.unwrap_err();
        assert!(matches!(err, MeetqError::UnknownTask { ref id, .. } if id == "bad"));

        // The malformed payload is gone; the queue keeps serving.
        let next = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(next.id.0, "t1");
    }
}
