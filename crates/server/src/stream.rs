//! Job status channel: a server-push stream over the job record.
//!
//! Polling-based rather than event-driven: job transitions are infrequent
//! and the authoritative state lives in the external record store, so the
//! stream re-reads the record on a fixed interval and pushes deltas. Raw
//! errors never reach the client; only a generic `{error}` message does.

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use meetq_core::{JobStatus, JobStore, SharedJobStore};

use crate::api::{authorized, AppState};

/// Open a server-push stream for one job.
///
/// Pushes the current status once immediately, then a delta per detected
/// transition. Closes shortly after a terminal status; client disconnect
/// tears the poll task down.
pub async fn stream_job(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    if !authorized(&req, &state.config.worker_token) {
        return HttpResponse::Unauthorized().finish();
    }

    let job_id = path.into_inner();
    let (tx, rx) = mpsc::channel::<Bytes>(16);
    tokio::spawn(poll_status(
        state.jobs.clone(),
        job_id,
        tx,
        state.config.stream_poll_interval,
        state.config.stream_linger,
    ));

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(ReceiverStream::new(rx).map(Ok::<Bytes, actix_web::Error>))
}

async fn poll_status(
    jobs: SharedJobStore,
    job_id: String,
    tx: mpsc::Sender<Bytes>,
    poll_interval: Duration,
    linger: Duration,
) {
    let mut last: Option<JobStatus> = None;

    loop {
        // The receiver drops when the client disconnects.
        if tx.is_closed() {
            tracing::debug!(job_id = %job_id, "Status stream client disconnected");
            break;
        }

        let record = match jobs.fetch(&job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                let _ = send_event(&tx, &json!({ "error": "job not found" })).await;
                break;
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Status poll failed");
                let _ = send_event(&tx, &json!({ "error": "status unavailable" })).await;
                break;
            }
        };

        if last != Some(record.status) {
            let mut payload = json!({ "status": record.status });
            if let Some(step) = &record.processing_step {
                payload["processingStep"] = json!(step);
            }
            if send_event(&tx, &payload).await.is_err() {
                tracing::debug!(job_id = %job_id, "Status stream client disconnected");
                break;
            }
            last = Some(record.status);

            if record.status.is_terminal() {
                // Keep the stream open briefly for final delivery.
                tokio::time::sleep(linger).await;
                break;
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}

async fn send_event(tx: &mpsc::Sender<Bytes>, payload: &serde_json::Value) -> Result<(), ()> {
    let frame = format!("data: {}\n\n", payload);
    tx.send(Bytes::from(frame)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetq_core::{JobRecord, MemoryJobStore};
    use std::sync::Arc;

    fn record(status: JobStatus, step: Option<&str>) -> JobRecord {
        JobRecord {
            id: "j1".to_string(),
            owner_id: "u1".to_string(),
            status,
            processing_step: step.map(String::from),
        }
    }

    async fn collect_frames(rx: &mut mpsc::Receiver<Bytes>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            let text = String::from_utf8(bytes.to_vec()).unwrap();
            let data = text
                .strip_prefix("data: ")
                .and_then(|t| t.strip_suffix("\n\n"))
                .unwrap();
            frames.push(serde_json::from_str(data).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_pushes_initial_status_and_transitions() {
        let store = Arc::new(MemoryJobStore::new());
        store
            .insert(record(JobStatus::Processing, Some("transcription")))
            .unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let jobs: SharedJobStore = store.clone();
        let poll = tokio::spawn(poll_status(
            jobs,
            "j1".to_string(),
            tx,
            Duration::from_millis(20),
            Duration::from_millis(10),
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        store
            .update_status("j1", JobStatus::Completed, None)
            .await
            .unwrap();
        poll.await.unwrap();

        let frames = collect_frames(&mut rx).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["status"], "PROCESSING");
        assert_eq!(frames[0]["processingStep"], "transcription");
        assert_eq!(frames[1]["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_unchanged_status_pushes_nothing_new() {
        let store = Arc::new(MemoryJobStore::new());
        store.insert(record(JobStatus::Processing, None)).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let jobs: SharedJobStore = store.clone();
        let poll = tokio::spawn(poll_status(
            jobs,
            "j1".to_string(),
            tx,
            Duration::from_millis(10),
            Duration::from_millis(5),
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        let frames = collect_frames(&mut rx).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["status"], "PROCESSING");

        // Client disconnect stops the polling loop.
        drop(rx);
        poll.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_job_sends_generic_error() {
        let jobs: SharedJobStore = MemoryJobStore::shared();
        let (tx, mut rx) = mpsc::channel(16);
        poll_status(
            jobs,
            "missing".to_string(),
            tx,
            Duration::from_millis(10),
            Duration::from_millis(5),
        )
        .await;

        let frames = collect_frames(&mut rx).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["error"], "job not found");
    }

    #[tokio::test]
    async fn test_terminal_status_closes_after_linger() {
        let store = Arc::new(MemoryJobStore::new());
        store.insert(record(JobStatus::Failed, None)).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let jobs: SharedJobStore = store.clone();
        let started = std::time::Instant::now();
        poll_status(
            jobs,
            "j1".to_string(),
            tx,
            Duration::from_millis(10),
            Duration::from_millis(40),
        )
        .await;
        assert!(started.elapsed() >= Duration::from_millis(40));

        let frames = collect_frames(&mut rx).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["status"], "FAILED");
    }
}
