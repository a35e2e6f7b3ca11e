#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared RPC DTOs for the Rarity remote-control surface.
//!
//! The daemon serves these shapes and the IRC bridge consumes them, so the contract lives in
//! one place. Torrent views are re-used directly from `rarity-torrent-core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use rarity_torrent_core::{InfoHash, TorrentMetainfo, TorrentRecord, TorrentStatusView};

/// Procedure submitting a `.torrent` URL.
pub const PROCEDURE_ADD_TORRENT: &str = "add_torrent";
/// Procedure pausing a torrent.
pub const PROCEDURE_PAUSE_TORRENT: &str = "pause_torrent";
/// Procedure resuming a torrent.
pub const PROCEDURE_RESUME_TORRENT: &str = "resume_torrent";
/// Procedure removing a torrent.
pub const PROCEDURE_REMOVE_TORRENT: &str = "remove_torrent";
/// Procedure reading a status view.
pub const PROCEDURE_GET_TORRENT_INFO: &str = "get_torrent_info";
/// Procedure reading a metainfo view.
pub const PROCEDURE_GET_TORRENT_METAINFO: &str = "get_torrent_metainfo";
/// Procedure searching torrents by name.
pub const PROCEDURE_FIND_TORRENT: &str = "find_torrent";
/// Procedure reading a display name.
pub const PROCEDURE_GET_TORRENT_NAME: &str = "get_torrent_name";

/// URL path serving `procedure`.
#[must_use]
pub fn rpc_path(procedure: &str) -> String {
    format!("/rpc/{procedure}")
}

/// RFC9457-compatible problem document surfaced on failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Stable problem identifier.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short constant summary.
    pub title: String,
    /// HTTP status mirrored in the body.
    pub status: u16,
    /// Human-readable context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// `add_torrent` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddTorrentRequest {
    /// Location of the `.torrent` file.
    pub url: String,
}

/// Request addressing one torrent by its textual info-hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TorrentTarget {
    /// Info-hash in either hex case.
    pub info_hash: String,
}

impl TorrentTarget {
    /// Address `info_hash`.
    #[must_use]
    pub fn new(info_hash: impl ToString) -> Self {
        Self {
            info_hash: info_hash.to_string(),
        }
    }
}

/// `find_torrent` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FindTorrentRequest {
    /// Unanchored regular expression matched against display names.
    pub pattern: String,
}

/// Reply to the mutating procedures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoHashResponse {
    /// Torrent the confirmed operation applied to.
    pub info_hash: InfoHash,
}

/// `get_torrent_name` reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TorrentNameResponse {
    /// Display name.
    pub name: String,
}

/// `find_torrent` reply: matching records keyed by info-hash.
pub type FindTorrentResponse = BTreeMap<InfoHash, TorrentRecord>;

/// Counters included in the health document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HealthMetrics {
    /// Outstanding waiters.
    pub waiters_pending: i64,
    /// Torrents in the session.
    pub active_torrents: i64,
    /// Waiters resolved by a matching alert.
    pub waiters_matched_total: u64,
    /// Waiters resolved by expiry.
    pub waiters_expired_total: u64,
}

/// `GET /health` reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Build identifier.
    pub build: String,
    /// Components currently degraded.
    pub degraded: Vec<String>,
    /// Selected counters.
    pub metrics: HealthMetrics,
}
