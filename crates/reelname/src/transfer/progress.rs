//! Transfer progress observers and the broadcast channel for streaming them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::GroupStatus;

/// Byte counts for one file in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    pub fn new(bytes_transferred: u64, total_bytes: u64) -> Self {
        Self {
            bytes_transferred,
            total_bytes,
        }
    }

    /// `transferred / total` in `[0, 1]`. A zero-byte file is always done.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// How a single file transfer ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    Completed {
        destination_path: String,
        total_bytes: u64,
    },
    /// `progress` is the last chunk reported, if any was.
    Failed {
        error: String,
        progress: Option<TransferProgress>,
    },
}

/// Receives progress for every file the scheduler runs.
///
/// Called from worker tasks, so implementations must not block.
pub trait TransferObserver: Send + Sync {
    fn on_progress(&self, file_id: i64, progress: TransferProgress);
    fn on_finished(&self, file_id: i64, outcome: &TransferOutcome);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl TransferObserver for NoopObserver {
    fn on_progress(&self, _file_id: i64, _progress: TransferProgress) {}
    fn on_finished(&self, _file_id: i64, _outcome: &TransferOutcome) {}
}

/// Progress event for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    pub file_id: i64,
    /// `transferring`, `completed` or `failed`.
    pub status: GroupStatus,
    pub progress: f64,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransferEvent {
    pub fn progress(file_id: i64, progress: TransferProgress) -> Self {
        Self {
            file_id,
            status: GroupStatus::Transferring,
            progress: progress.fraction(),
            bytes_transferred: progress.bytes_transferred,
            total_bytes: progress.total_bytes,
            destination_path: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn finished(file_id: i64, outcome: &TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Completed {
                destination_path,
                total_bytes,
            } => Self {
                file_id,
                status: GroupStatus::Completed,
                progress: 1.0,
                bytes_transferred: *total_bytes,
                total_bytes: *total_bytes,
                destination_path: Some(destination_path.clone()),
                error: None,
                timestamp: Utc::now(),
            },
            TransferOutcome::Failed { error, progress } => Self {
                file_id,
                status: GroupStatus::Failed,
                progress: progress.map_or(0.0, |p| p.fraction()),
                bytes_transferred: progress.map_or(0, |p| p.bytes_transferred),
                total_bytes: progress.map_or(0, |p| p.total_bytes),
                destination_path: None,
                error: Some(error.clone()),
                timestamp: Utc::now(),
            },
        }
    }
}

/// Broadcasts transfer events to any number of subscribers.
#[derive(Clone)]
pub struct TransferProgressBroadcaster {
    sender: Arc<broadcast::Sender<TransferEvent>>,
}

impl TransferProgressBroadcaster {
    /// Creates a broadcaster whose subscribers lag after `capacity` unread events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: TransferEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TransferProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TransferObserver for TransferProgressBroadcaster {
    fn on_progress(&self, file_id: i64, progress: TransferProgress) {
        self.send(TransferEvent::progress(file_id, progress));
    }

    fn on_finished(&self, file_id: i64, outcome: &TransferOutcome) {
        self.send(TransferEvent::finished(file_id, outcome));
    }
}
