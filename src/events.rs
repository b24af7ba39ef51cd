//! Event types delivered to the single consumer of each component.
//!
//! Every component is handed an [`EventSink`] at construction. Events for one
//! operation arrive in order and the terminal event is always the last one
//! for that operation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::MediaError;

/// Sending half handed to components. Unbounded so producers never stall
/// on a slow consumer.
pub type EventSink<E> = mpsc::UnboundedSender<E>;

/// Receiving half owned by the consumer.
pub type EventStream<E> = mpsc::UnboundedReceiver<E>;

pub fn event_channel<E>() -> (EventSink<E>, EventStream<E>) {
    mpsc::unbounded_channel()
}

/// One progress computation for recording or playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSample {
    pub elapsed_secs: u32,
    pub remaining_secs: u32,
    pub percent: u32,
}

/// Terminal outcome of one download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    pub file_path: PathBuf,
    pub succeeded: bool,
    /// 100 on success, -1 on failure
    pub final_percent: i32,
}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Started {
        path: PathBuf,
    },
    Progress {
        path: PathBuf,
        percent: i32,
    },
    /// Terminal: exactly one per download attempt
    Finished {
        path: PathBuf,
        success: bool,
        percent: i32,
    },
    /// Follows a failed `Finished`
    Error {
        cause: Arc<MediaError>,
    },
    /// Follows a successful network download
    Complete {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    Started,
    Progress(ProgressSample),
    /// Terminal
    Stopped { success: bool },
}

#[derive(Debug, Clone)]
pub enum PlayEvent {
    Started { path: PathBuf },
    Paused { path: PathBuf },
    Resumed { path: PathBuf },
    Progress(ProgressSample),
    /// Terminal for a playback that started
    Stopped { path: PathBuf },
    /// Terminal for a playback that never started
    Error { path: PathBuf, cause: Arc<MediaError> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum OperationStatus {
    Idle,
    Starting,
    Active,
    Paused,
    Stopping,
    Finished { success: bool },
}

/// Snapshot of one in-flight download, recording or playback.
#[derive(Debug, Clone, Serialize)]
pub struct MediaOperation {
    pub id: Uuid,
    pub resource: String,
    pub status: OperationStatus,
    pub started_at: DateTime<Utc>,
}

impl MediaOperation {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource: resource.into(),
            status: OperationStatus::Starting,
            started_at: Utc::now(),
        }
    }
}
