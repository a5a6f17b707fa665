//! Job record seam.
//!
//! The authoritative job record lives in the application's persistent store.
//! This layer only reads and writes `status` and `processing_step` and never
//! interprets the rest of the record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{MeetqError, Result};

/// Lifecycle status of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl JobStatus {
    /// Whether this status ends the job's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The slice of a job record this layer touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    pub status: JobStatus,
    #[serde(rename = "processingStep", skip_serializing_if = "Option::is_none")]
    pub processing_step: Option<String>,
}

/// Read/write access to job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a job record, or `None` if it does not exist.
    async fn fetch(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// Update a job's status and processing step.
    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        processing_step: Option<String>,
    ) -> Result<()>;
}

/// A type-erased job store handle.
pub type SharedJobStore = Arc<dyn JobStore>;

/// In-process job store for tests and demos.
#[derive(Default)]
pub struct MemoryJobStore {
    records: Mutex<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedJobStore {
        Arc::new(Self::new())
    }

    /// Insert a record, replacing any existing one with the same id.
    pub fn insert(&self, record: JobRecord) -> Result<()> {
        let mut records = self.lock()?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, JobRecord>>> {
        self.records
            .lock()
            .map_err(|_| MeetqError::Store("job store lock poisoned".to_string()))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn fetch(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let records = self.lock()?;
        Ok(records.get(job_id).cloned())
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        processing_step: Option<String>,
    ) -> Result<()> {
        let mut records = self.lock()?;
        match records.get_mut(job_id) {
            Some(record) => {
                record.status = status;
                record.processing_step = processing_step;
                Ok(())
            }
            None => Err(MeetqError::Store(format!("job not found: {}", job_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_and_update() {
        let store = MemoryJobStore::new();
        store
            .insert(JobRecord {
                id: "j1".to_string(),
                owner_id: "u1".to_string(),
                status: JobStatus::Pending,
                processing_step: None,
            })
            .unwrap();

        let record = store.fetch("j1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Pending);

        store
            .update_status("j1", JobStatus::Processing, Some("transcription".to_string()))
            .await
            .unwrap();
        let record = store.fetch("j1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.processing_step.as_deref(), Some("transcription"));
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let store = MemoryJobStore::new();
        assert!(store.fetch("nope").await.unwrap().is_none());
        assert!(store
            .update_status("nope", JobStatus::Failed, None)
            .await
            .is_err());
    }

    #[test]
    fn test_terminal_status() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
    }
}
