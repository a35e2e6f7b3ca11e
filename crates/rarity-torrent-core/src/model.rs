//! Snapshot views derived from live engine handles.

use serde::{Deserialize, Serialize};

use crate::info_hash::InfoHash;

/// Transfer state of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TorrentStatusView {
    /// Whether the transfer is paused.
    pub paused: bool,
    /// Completed fraction in `[0, 1]`.
    pub progress: f64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Download rate in bytes per second.
    pub download_rate: u64,
}

impl TorrentStatusView {
    /// Clamp progress into the unit interval.
    #[must_use]
    pub fn normalised(mut self) -> Self {
        self.progress = self.progress.clamp(0.0, 1.0);
        self
    }
}

/// Static description of a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentMetainfo {
    /// Display name.
    pub name: String,
    /// Number of pieces.
    pub pieces: u32,
    /// Whether the torrent is flagged private.
    pub private: bool,
}

/// Combined status and metainfo snapshot for one torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Canonical identifier.
    pub info_hash: InfoHash,
    /// Display name.
    pub name: String,
    /// Whether the transfer is paused.
    pub paused: bool,
    /// Completed fraction in `[0, 1]`.
    pub progress: f64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Download rate in bytes per second.
    pub download_rate: u64,
    /// Number of pieces.
    pub pieces: u32,
    /// Whether the torrent is flagged private.
    pub private: bool,
}

impl TorrentRecord {
    /// Merge the two views of a torrent into one record.
    #[must_use]
    pub fn from_parts(
        info_hash: InfoHash,
        status: TorrentStatusView,
        metainfo: TorrentMetainfo,
    ) -> Self {
        let status = status.normalised();
        Self {
            info_hash,
            name: metainfo.name,
            paused: status.paused,
            progress: status.progress,
            upload_rate: status.upload_rate,
            download_rate: status.download_rate,
            pieces: metainfo.pieces,
            private: metainfo.private,
        }
    }
}
