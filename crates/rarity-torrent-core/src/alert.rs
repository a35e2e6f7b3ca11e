//! Engine-emitted notifications.
//!
//! # Design
//! - Alerts are a closed tagged enum; predicates match on variants rather than runtime types.
//! - Every alert carries its emission time; the info-hash is optional because some alerts
//!   are session-global.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::info_hash::InfoHash;

/// Mutating operations the engine confirms or rejects through alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentOperation {
    /// Torrent submission.
    Add,
    /// Pause request.
    Pause,
    /// Resume request.
    Resume,
    /// Removal request.
    Remove,
    /// Resume-data generation request.
    SaveResumeData,
}

impl TorrentOperation {
    /// Stable identifier used in logs and error context.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add_torrent",
            Self::Pause => "pause_torrent",
            Self::Resume => "resume_torrent",
            Self::Remove => "remove_torrent",
            Self::SaveResumeData => "save_resume_data",
        }
    }

    /// Whether `event` is the engine's confirmation that this operation completed.
    #[must_use]
    pub const fn is_confirmed_by(self, event: &AlertEvent) -> bool {
        match (self, event) {
            (
                Self::Add,
                AlertEvent::OperationCompleted {
                    operation: Self::Add,
                    ..
                },
            )
            | (
                Self::Pause,
                AlertEvent::StatusChanged {
                    status: TorrentStatusChange::Paused,
                    ..
                },
            )
            | (
                Self::Resume,
                AlertEvent::StatusChanged {
                    status: TorrentStatusChange::Resumed,
                    ..
                },
            )
            | (Self::Remove, AlertEvent::TorrentRemoved { .. })
            | (Self::SaveResumeData, AlertEvent::ResumeDataReady { .. }) => true,
            _ => false,
        }
    }
}

impl Display for TorrentOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status transitions reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatusChange {
    /// Transfer paused.
    Paused,
    /// Transfer resumed.
    Resumed,
    /// Piece verification in progress.
    Checking,
    /// Actively downloading.
    Downloading,
    /// All pieces present.
    Finished,
}

/// Alert payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertEvent {
    /// A mutating operation completed.
    OperationCompleted {
        /// Affected torrent.
        info_hash: InfoHash,
        /// Operation that completed.
        operation: TorrentOperation,
    },
    /// A mutating operation failed inside the engine.
    OperationFailed {
        /// Affected torrent.
        info_hash: InfoHash,
        /// Operation that failed.
        operation: TorrentOperation,
        /// Engine diagnostic.
        message: String,
    },
    /// Torrent status changed.
    StatusChanged {
        /// Affected torrent.
        info_hash: InfoHash,
        /// New status.
        status: TorrentStatusChange,
    },
    /// Resume data was generated and is ready to persist.
    ResumeDataReady {
        /// Affected torrent.
        info_hash: InfoHash,
        /// Engine-opaque resume blob.
        payload: Vec<u8>,
    },
    /// Torrent was removed from the session.
    TorrentRemoved {
        /// Removed torrent.
        info_hash: InfoHash,
    },
    /// Engine error notification.
    Error {
        /// Affected torrent, if any.
        info_hash: Option<InfoHash>,
        /// Engine diagnostic.
        message: String,
    },
    /// Any other notification.
    Other {
        /// Affected torrent, if any.
        info_hash: Option<InfoHash>,
        /// Engine diagnostic.
        message: String,
    },
}

/// Field-less discriminant of [`AlertEvent`], used for labels and type predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// See [`AlertEvent::OperationCompleted`].
    OperationCompleted,
    /// See [`AlertEvent::OperationFailed`].
    OperationFailed,
    /// See [`AlertEvent::StatusChanged`].
    StatusChanged,
    /// See [`AlertEvent::ResumeDataReady`].
    ResumeDataReady,
    /// See [`AlertEvent::TorrentRemoved`].
    TorrentRemoved,
    /// See [`AlertEvent::Error`].
    Error,
    /// See [`AlertEvent::Other`].
    Other,
}

impl AlertKind {
    /// Stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OperationCompleted => "operation_completed",
            Self::OperationFailed => "operation_failed",
            Self::StatusChanged => "status_changed",
            Self::ResumeDataReady => "resume_data_ready",
            Self::TorrentRemoved => "torrent_removed",
            Self::Error => "error",
            Self::Other => "other",
        }
    }
}

impl Display for AlertKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted by the torrent engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Emission timestamp.
    pub emitted_at: DateTime<Utc>,
    /// Payload.
    pub event: AlertEvent,
}

impl Alert {
    /// Stamp an event with the current time.
    #[must_use]
    pub fn new(event: AlertEvent) -> Self {
        Self {
            emitted_at: Utc::now(),
            event,
        }
    }

    /// Discriminant of the payload.
    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        match &self.event {
            AlertEvent::OperationCompleted { .. } => AlertKind::OperationCompleted,
            AlertEvent::OperationFailed { .. } => AlertKind::OperationFailed,
            AlertEvent::StatusChanged { .. } => AlertKind::StatusChanged,
            AlertEvent::ResumeDataReady { .. } => AlertKind::ResumeDataReady,
            AlertEvent::TorrentRemoved { .. } => AlertKind::TorrentRemoved,
            AlertEvent::Error { .. } => AlertKind::Error,
            AlertEvent::Other { .. } => AlertKind::Other,
        }
    }

    /// Torrent the alert refers to, if any.
    #[must_use]
    pub const fn info_hash(&self) -> Option<InfoHash> {
        match &self.event {
            AlertEvent::OperationCompleted { info_hash, .. }
            | AlertEvent::OperationFailed { info_hash, .. }
            | AlertEvent::StatusChanged { info_hash, .. }
            | AlertEvent::ResumeDataReady { info_hash, .. }
            | AlertEvent::TorrentRemoved { info_hash } => Some(*info_hash),
            AlertEvent::Error { info_hash, .. } | AlertEvent::Other { info_hash, .. } => {
                *info_hash
            }
        }
    }

    /// Human-readable summary for logs.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.event {
            AlertEvent::OperationCompleted {
                info_hash,
                operation,
            } => format!("{operation} completed for {info_hash}"),
            AlertEvent::OperationFailed {
                info_hash,
                operation,
                message,
            } => format!("{operation} failed for {info_hash}: {message}"),
            AlertEvent::StatusChanged { info_hash, status } => {
                format!("{info_hash} is now {status:?}")
            }
            AlertEvent::ResumeDataReady { info_hash, payload } => {
                format!("resume data ready for {info_hash} ({} bytes)", payload.len())
            }
            AlertEvent::TorrentRemoved { info_hash } => format!("{info_hash} removed"),
            AlertEvent::Error { message, .. } | AlertEvent::Other { message, .. } => {
                message.clone()
            }
        }
    }

    /// Convenience constructor for [`AlertEvent::OperationCompleted`].
    #[must_use]
    pub fn operation_completed(info_hash: InfoHash, operation: TorrentOperation) -> Self {
        Self::new(AlertEvent::OperationCompleted {
            info_hash,
            operation,
        })
    }

    /// Convenience constructor for [`AlertEvent::StatusChanged`].
    #[must_use]
    pub fn status_changed(info_hash: InfoHash, status: TorrentStatusChange) -> Self {
        Self::new(AlertEvent::StatusChanged { info_hash, status })
    }
}
