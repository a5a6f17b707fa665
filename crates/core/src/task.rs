//! Task definition and dead-letter types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task.
///
/// Identity is caller-assigned; the queue never deduplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random TaskId.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The closed set of task kinds with their typed payloads.
///
/// Dispatch is an exhaustive match, so adding a kind forces every dispatch
/// site to handle it. On the wire this is `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskKind {
    /// Run the AI pipeline (transcription, summarization, code generation)
    /// for one meeting job.
    #[serde(rename = "PROCESS_MEETING_AI")]
    ProcessMeetingAi {
        #[serde(rename = "jobId")]
        job_id: String,
    },
}

impl TaskKind {
    /// The wire name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::ProcessMeetingAi { .. } => "PROCESS_MEETING_AI",
        }
    }
}

/// A unit of work held by the durable queue.
///
/// Mutated only by incrementing `retries` on re-enqueue; destroyed when
/// successfully processed or moved to the dead letter queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Caller-assigned unique identifier.
    pub id: TaskId,
    /// Task kind and payload.
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Number of times this task has been re-enqueued after a failure.
    pub retries: u32,
}

impl Task {
    /// Create a new task with a random id and zero retries.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            id: TaskId::random(),
            kind,
            retries: 0,
        }
    }

    /// Create a task with a caller-assigned id.
    pub fn with_id(id: impl Into<TaskId>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            kind,
            retries: 0,
        }
    }

    /// Serialize the task to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a task from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A task that exhausted its retry budget, retained for manual inspection
/// and replay. Never mutated and never automatically re-processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// The task as it was when it exceeded the retry budget.
    pub task: Task,
    /// The failure message from the last attempt.
    pub reason: String,
    /// Unix timestamp in milliseconds when the task was moved.
    #[serde(rename = "movedAt")]
    pub moved_at: i64,
}

/// Get current Unix timestamp in milliseconds.
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new(TaskKind::ProcessMeetingAi {
            job_id: "j1".to_string(),
        });
        assert_eq!(task.retries, 0);
        assert_eq!(task.kind.name(), "PROCESS_MEETING_AI");
    }

    #[test]
    fn test_task_wire_format() {
        let task = Task::with_id(
            "t1",
            TaskKind::ProcessMeetingAi {
                job_id: "j1".to_string(),
            },
        );
        let json = task.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], "t1");
        assert_eq!(value["type"], "PROCESS_MEETING_AI");
        assert_eq!(value["data"]["jobId"], "j1");
        assert_eq!(value["retries"], 0);
    }

    #[test]
    fn test_task_roundtrip() {
        let task = Task::with_id(
            "t1",
            TaskKind::ProcessMeetingAi {
                job_id: "j1".to_string(),
            },
        );
        let parsed = Task::from_json(&task.to_json().unwrap()).unwrap();
        assert_eq!(parsed, task);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"id":"t9","type":"SEND_EMAIL","data":{},"retries":0}"#;
        assert!(Task::from_json(json).is_err());
    }
}
