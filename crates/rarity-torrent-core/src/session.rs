//! Collaborator seams: the engine session, its torrent handles, resume persistence, and
//! metainfo fetching.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::TorrentResult;
use crate::info_hash::InfoHash;
use crate::metainfo::TorrentDescriptor;
use crate::model::{TorrentMetainfo, TorrentRecord, TorrentStatusView};

/// Live torrent inside an engine session.
pub trait TorrentHandle: Send + Sync {
    /// Canonical identifier.
    fn info_hash(&self) -> InfoHash;
    /// Display name.
    fn name(&self) -> String;
    /// Current transfer state.
    fn status(&self) -> TorrentStatusView;
    /// Static description.
    fn metainfo(&self) -> TorrentMetainfo;
    /// Request a pause; confirmation arrives as an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the request.
    fn pause(&self) -> Result<()>;
    /// Request a resume; confirmation arrives as an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the request.
    fn resume(&self) -> Result<()>;
    /// Request resume-data generation; the blob arrives as an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the request.
    fn request_resume_data(&self) -> Result<()>;

    /// Combined snapshot of both views.
    fn record(&self) -> TorrentRecord {
        TorrentRecord::from_parts(self.info_hash(), self.status(), self.metainfo())
    }
}

/// Torrent engine session: owns the live handle set and the alert queue.
pub trait EngineSession: Send + Sync {
    /// Pop the oldest pending alert without blocking.
    fn pop_alert(&self) -> Option<Alert>;
    /// Submit a parsed torrent; confirmation arrives as an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the torrent.
    fn submit_torrent(&self, descriptor: &TorrentDescriptor) -> Result<()>;
    /// Locate a live handle.
    fn find_handle(&self, info_hash: &InfoHash) -> Option<Arc<dyn TorrentHandle>>;
    /// All live handles.
    fn list_handles(&self) -> Vec<Arc<dyn TorrentHandle>>;
    /// Remove a torrent; confirmation arrives as an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the removal.
    fn remove_torrent(&self, info_hash: &InfoHash) -> Result<()>;
    /// Start DHT, optionally seeded from a persisted routing-table snapshot.
    /// Returns the number of nodes restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be decoded.
    fn start_dht(&self, snapshot: Option<&[u8]>) -> Result<usize>;
    /// Serialise the current DHT routing table.
    ///
    /// # Errors
    ///
    /// Returns an error if the routing table cannot be encoded.
    fn dht_state(&self) -> Result<Vec<u8>>;
}

/// Resume-data persistence keyed by info-hash.
pub trait ResumeStateStore: Send + Sync {
    /// Write (or replace) the blob for a torrent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TorrentError::Storage`] when the backend write fails.
    fn put(&self, info_hash: &InfoHash, payload: &[u8]) -> TorrentResult<()>;
    /// Read the blob for a torrent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TorrentError::NotFound`] when nothing is stored.
    fn get(&self, info_hash: &InfoHash) -> TorrentResult<Vec<u8>>;
    /// Forget the blob for a torrent; absent entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TorrentError::Storage`] when the backend delete fails.
    fn remove(&self, info_hash: &InfoHash) -> TorrentResult<()>;
}

/// Retrieves `.torrent` bytes from a locator.
#[async_trait]
pub trait MetainfoFetcher: Send + Sync {
    /// Fetch raw metainfo bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TorrentError::Transport`] on any retrieval failure.
    async fn fetch(&self, url: &str) -> TorrentResult<Vec<u8>>;
}
