//! In-memory [`TorrentRemote`] for bot and session tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rarity_api_models::{
    FindTorrentResponse, InfoHash, PROCEDURE_ADD_TORRENT, PROCEDURE_FIND_TORRENT,
    PROCEDURE_GET_TORRENT_METAINFO, PROCEDURE_GET_TORRENT_NAME, PROCEDURE_PAUSE_TORRENT,
    PROCEDURE_RESUME_TORRENT, ProblemDetails, TorrentMetainfo, TorrentRecord,
};

use crate::client::{RemoteError, RemoteResult, TorrentRemote};

#[derive(Default)]
pub(crate) struct FakeRemote {
    torrents: Mutex<BTreeMap<InfoHash, TorrentRecord>>,
    last_added: Option<InfoHash>,
    failure: Option<String>,
}

impl FakeRemote {
    /// Register a torrent; `add_torrent` answers with the most recent one.
    pub(crate) fn with_torrent(mut self, byte: u8, name: &str) -> Self {
        let info_hash = InfoHash::new([byte; 20]);
        self.torrents
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                info_hash,
                TorrentRecord {
                    info_hash,
                    name: name.to_string(),
                    paused: false,
                    progress: 0.0,
                    upload_rate: 0,
                    download_rate: 0,
                    pieces: 1,
                    private: false,
                },
            );
        self.last_added = Some(info_hash);
        self
    }

    /// Make every call fail with a problem document carrying `detail`.
    pub(crate) fn failing(mut self, detail: &str) -> Self {
        self.failure = Some(detail.to_string());
        self
    }

    pub(crate) fn is_paused(&self, byte: u8) -> bool {
        self.torrents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&InfoHash::new([byte; 20]))
            .is_some_and(|record| record.paused)
    }

    fn check(&self, procedure: &'static str) -> RemoteResult<()> {
        match &self.failure {
            Some(detail) => Err(problem(procedure, 502, Some(detail.clone()))),
            None => Ok(()),
        }
    }

    fn record(&self, procedure: &'static str, info_hash: &InfoHash) -> RemoteResult<TorrentRecord> {
        self.check(procedure)?;
        self.torrents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(info_hash)
            .cloned()
            .ok_or_else(|| problem(procedure, 404, Some(format!("no torrent {info_hash}"))))
    }

    fn set_paused(
        &self,
        procedure: &'static str,
        info_hash: &InfoHash,
        paused: bool,
    ) -> RemoteResult<InfoHash> {
        self.check(procedure)?;
        let mut torrents = self.torrents.lock().unwrap_or_else(PoisonError::into_inner);
        let record = torrents
            .get_mut(info_hash)
            .ok_or_else(|| problem(procedure, 404, None))?;
        record.paused = paused;
        Ok(*info_hash)
    }
}

fn problem(procedure: &'static str, status: u16, detail: Option<String>) -> RemoteError {
    RemoteError::Problem {
        procedure,
        problem: ProblemDetails {
            kind: "https://rarity.dev/problems/test".to_string(),
            title: "test failure".to_string(),
            status,
            detail,
        },
        request_id: None,
    }
}

#[async_trait]
impl TorrentRemote for FakeRemote {
    async fn add_torrent(&self, _url: &str) -> RemoteResult<InfoHash> {
        self.check(PROCEDURE_ADD_TORRENT)?;
        self.last_added
            .ok_or_else(|| problem(PROCEDURE_ADD_TORRENT, 502, None))
    }

    async fn find_torrent(&self, pattern: &str) -> RemoteResult<FindTorrentResponse> {
        self.check(PROCEDURE_FIND_TORRENT)?;
        Ok(self
            .torrents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, record)| record.name.contains(pattern))
            .map(|(info_hash, record)| (*info_hash, record.clone()))
            .collect())
    }

    async fn pause_torrent(&self, info_hash: &InfoHash) -> RemoteResult<InfoHash> {
        self.set_paused(PROCEDURE_PAUSE_TORRENT, info_hash, true)
    }

    async fn resume_torrent(&self, info_hash: &InfoHash) -> RemoteResult<InfoHash> {
        self.set_paused(PROCEDURE_RESUME_TORRENT, info_hash, false)
    }

    async fn get_torrent_metainfo(&self, info_hash: &InfoHash) -> RemoteResult<TorrentMetainfo> {
        let record = self.record(PROCEDURE_GET_TORRENT_METAINFO, info_hash)?;
        Ok(TorrentMetainfo {
            name: record.name,
            pieces: record.pieces,
            private: record.private,
        })
    }

    async fn get_torrent_name(&self, info_hash: &InfoHash) -> RemoteResult<String> {
        Ok(self.record(PROCEDURE_GET_TORRENT_NAME, info_hash)?.name)
    }
}
