use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use rarity_torrent_core::{
    Alert, AlertEvent, EngineSession, InfoHash, TorrentDescriptor, TorrentHandle,
    TorrentMetainfo, TorrentOperation, TorrentStatusChange, TorrentStatusView,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::SessionError;

/// Alert queue bound used when none is configured.
pub const DEFAULT_ALERT_CAPACITY: usize = 4096;

/// Boot parameters for an engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Peer listen port.
    pub listen_port: u16,
    /// Directory new torrents download into.
    pub download_dir: PathBuf,
    /// DHT bootstrap routers as `host:port`.
    pub dht_routers: Vec<String>,
    /// Whether local service discovery is enabled.
    pub local_discovery: bool,
    /// Maximum number of queued alerts; newer alerts are dropped beyond it.
    pub alert_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            listen_port: 23_866,
            download_dir: PathBuf::from("/tmp"),
            dht_routers: vec!["router.bittorrent.com:6881".to_string()],
            local_discovery: true,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DhtSnapshot {
    nodes: Vec<String>,
}

struct MemoryTorrent {
    descriptor: TorrentDescriptor,
    status: TorrentStatusView,
}

struct SessionState {
    torrents: BTreeMap<InfoHash, MemoryTorrent>,
    alerts: VecDeque<Alert>,
    capacity: usize,
    dropped: u64,
    rejections: HashMap<TorrentOperation, String>,
    failures: HashMap<TorrentOperation, String>,
    dht_nodes: Option<Vec<String>>,
}

impl SessionState {
    fn enqueue(&mut self, alert: Alert) -> bool {
        if self.alerts.len() >= self.capacity {
            self.dropped += 1;
            warn!(
                kind = %alert.kind(),
                dropped = self.dropped,
                "alert queue full; dropping alert"
            );
            return false;
        }
        self.alerts.push_back(alert);
        true
    }

    /// Apply any scripted outcome for `operation`. `Ok(false)` means a failure alert was
    /// queued instead of performing the operation.
    fn scripted(&mut self, operation: TorrentOperation, info_hash: InfoHash) -> Result<bool> {
        if let Some(message) = self.rejections.remove(&operation) {
            return Err(SessionError::Rejected {
                operation: operation.as_str(),
                message,
            }
            .into());
        }
        if let Some(message) = self.failures.remove(&operation) {
            self.enqueue(Alert::new(AlertEvent::OperationFailed {
                info_hash,
                operation,
                message,
            }));
            return Ok(false);
        }
        Ok(true)
    }

    fn torrent_mut(&mut self, info_hash: &InfoHash) -> Result<&mut MemoryTorrent> {
        self.torrents.get_mut(info_hash).ok_or_else(|| {
            SessionError::UnknownTorrent {
                info_hash: *info_hash,
            }
            .into()
        })
    }
}

/// Engine session that keeps torrents and alerts in memory.
///
/// Every mutating call queues the alert a real engine would emit, so the alert pump and the
/// correlator behave exactly as they would against a networked session.
#[derive(Clone)]
pub struct MemorySession {
    state: Arc<Mutex<SessionState>>,
    settings: Arc<SessionSettings>,
}

impl MemorySession {
    /// Create a session from boot parameters.
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        let state = SessionState {
            torrents: BTreeMap::new(),
            alerts: VecDeque::new(),
            capacity: settings.alert_capacity.max(1),
            dropped: 0,
            rejections: HashMap::new(),
            failures: HashMap::new(),
            dht_nodes: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            settings: Arc::new(settings),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Boot parameters the session was created with.
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Queue an externally produced alert. Returns `false` when the queue was full.
    pub fn push_alert(&self, alert: Alert) -> bool {
        self.lock().enqueue(alert)
    }

    /// Alerts waiting to be popped.
    #[must_use]
    pub fn pending_alerts(&self) -> usize {
        self.lock().alerts.len()
    }

    /// Alerts discarded because the queue was full.
    #[must_use]
    pub fn dropped_alerts(&self) -> u64 {
        self.lock().dropped
    }

    /// Make the next `operation` call fail synchronously with `message`.
    pub fn reject_next(&self, operation: TorrentOperation, message: impl Into<String>) {
        self.lock().rejections.insert(operation, message.into());
    }

    /// Make the next `operation` call be accepted but answered with an `OperationFailed` alert.
    pub fn fail_next(&self, operation: TorrentOperation, message: impl Into<String>) {
        self.lock().failures.insert(operation, message.into());
    }

    /// Update transfer counters for a torrent. Returns `false` when the torrent is unknown.
    pub fn set_transfer(
        &self,
        info_hash: &InfoHash,
        progress: f64,
        download_rate: u64,
        upload_rate: u64,
    ) -> bool {
        let mut state = self.lock();
        let Some(torrent) = state.torrents.get_mut(info_hash) else {
            return false;
        };
        let was_finished = torrent.status.progress >= 1.0;
        torrent.status = TorrentStatusView {
            progress,
            download_rate,
            upload_rate,
            ..torrent.status
        }
        .normalised();
        if !was_finished && torrent.status.progress >= 1.0 {
            state.enqueue(Alert::status_changed(
                *info_hash,
                TorrentStatusChange::Finished,
            ));
        }
        true
    }

    /// Whether DHT has been started.
    #[must_use]
    pub fn dht_running(&self) -> bool {
        self.lock().dht_nodes.is_some()
    }

    fn handle(&self, info_hash: InfoHash) -> Arc<dyn TorrentHandle> {
        Arc::new(MemoryHandle {
            info_hash,
            state: Arc::clone(&self.state),
        })
    }
}

impl EngineSession for MemorySession {
    fn pop_alert(&self) -> Option<Alert> {
        self.lock().alerts.pop_front()
    }

    fn submit_torrent(&self, descriptor: &TorrentDescriptor) -> Result<()> {
        let info_hash = descriptor.info_hash;
        let mut state = self.lock();
        if state.torrents.contains_key(&info_hash) {
            return Err(SessionError::DuplicateTorrent { info_hash }.into());
        }
        if !state.scripted(TorrentOperation::Add, info_hash)? {
            return Ok(());
        }
        state.torrents.insert(
            info_hash,
            MemoryTorrent {
                descriptor: descriptor.clone(),
                status: TorrentStatusView::default(),
            },
        );
        state.enqueue(Alert::operation_completed(info_hash, TorrentOperation::Add));
        Ok(())
    }

    fn find_handle(&self, info_hash: &InfoHash) -> Option<Arc<dyn TorrentHandle>> {
        let known = self.lock().torrents.contains_key(info_hash);
        known.then(|| self.handle(*info_hash))
    }

    fn list_handles(&self) -> Vec<Arc<dyn TorrentHandle>> {
        let known: Vec<InfoHash> = self.lock().torrents.keys().copied().collect();
        known.into_iter().map(|info_hash| self.handle(info_hash)).collect()
    }

    fn remove_torrent(&self, info_hash: &InfoHash) -> Result<()> {
        let mut state = self.lock();
        if !state.torrents.contains_key(info_hash) {
            return Err(SessionError::UnknownTorrent {
                info_hash: *info_hash,
            }
            .into());
        }
        if !state.scripted(TorrentOperation::Remove, *info_hash)? {
            return Ok(());
        }
        state.torrents.remove(info_hash);
        state.enqueue(Alert::new(AlertEvent::TorrentRemoved {
            info_hash: *info_hash,
        }));
        Ok(())
    }

    fn start_dht(&self, snapshot: Option<&[u8]>) -> Result<usize> {
        let restored = match snapshot {
            Some(bytes) => serde_bencode::from_bytes::<DhtSnapshot>(bytes)
                .map_err(|source| SessionError::DhtSnapshot { source })?,
            None => DhtSnapshot::default(),
        };
        let count = restored.nodes.len();
        let mut nodes = restored.nodes;
        for router in &self.settings.dht_routers {
            if !nodes.contains(router) {
                nodes.push(router.clone());
            }
        }
        self.lock().dht_nodes = Some(nodes);
        Ok(count)
    }

    fn dht_state(&self) -> Result<Vec<u8>> {
        let nodes = self.lock().dht_nodes.clone().unwrap_or_default();
        serde_bencode::to_bytes(&DhtSnapshot { nodes })
            .map_err(|source| SessionError::DhtSnapshot { source }.into())
    }
}

/// Handle onto a torrent owned by a [`MemorySession`].
#[derive(Clone)]
pub struct MemoryHandle {
    info_hash: InfoHash,
    state: Arc<Mutex<SessionState>>,
}

impl MemoryHandle {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, view: impl FnOnce(&MemoryTorrent) -> T) -> Option<T> {
        self.lock().torrents.get(&self.info_hash).map(view)
    }

    fn transition(&self, operation: TorrentOperation, paused: bool) -> Result<()> {
        let mut state = self.lock();
        state.torrent_mut(&self.info_hash)?;
        if !state.scripted(operation, self.info_hash)? {
            return Ok(());
        }
        state.torrent_mut(&self.info_hash)?.status.paused = paused;
        let status = if paused {
            TorrentStatusChange::Paused
        } else {
            TorrentStatusChange::Resumed
        };
        state.enqueue(Alert::status_changed(self.info_hash, status));
        Ok(())
    }
}

impl TorrentHandle for MemoryHandle {
    fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    fn name(&self) -> String {
        self.read(|torrent| torrent.descriptor.name.clone())
            .unwrap_or_default()
    }

    fn status(&self) -> TorrentStatusView {
        self.read(|torrent| torrent.status).unwrap_or_default()
    }

    fn metainfo(&self) -> TorrentMetainfo {
        self.read(|torrent| torrent.descriptor.metainfo())
            .unwrap_or_else(|| TorrentMetainfo {
                name: String::new(),
                pieces: 0,
                private: false,
            })
    }

    fn pause(&self) -> Result<()> {
        self.transition(TorrentOperation::Pause, true)
    }

    fn resume(&self) -> Result<()> {
        self.transition(TorrentOperation::Resume, false)
    }

    fn request_resume_data(&self) -> Result<()> {
        let mut state = self.lock();
        state.torrent_mut(&self.info_hash)?;
        if !state.scripted(TorrentOperation::SaveResumeData, self.info_hash)? {
            return Ok(());
        }
        let torrent = state.torrent_mut(&self.info_hash)?;
        let payload = json!({
            "info_hash": self.info_hash.to_hex(),
            "name": torrent.descriptor.name,
            "paused": torrent.status.paused,
            "progress": torrent.status.progress,
            "piece_count": torrent.descriptor.piece_count,
        })
        .to_string()
        .into_bytes();
        state.enqueue(Alert::new(AlertEvent::ResumeDataReady {
            info_hash: self.info_hash,
            payload,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use rarity_test_support::fixtures::MetainfoFixture;

    fn descriptor(name: &str) -> Result<TorrentDescriptor> {
        Ok(TorrentDescriptor::from_bytes(
            &MetainfoFixture::new(name).encode(),
        )?)
    }

    fn next_event(session: &MemorySession) -> Result<AlertEvent> {
        session
            .pop_alert()
            .map(|alert| alert.event)
            .ok_or_else(|| anyhow!("expected a queued alert"))
    }

    #[test]
    fn submit_queues_completion_and_rejects_duplicates() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        let torrent = descriptor("ubuntu")?;
        session.submit_torrent(&torrent)?;

        assert_eq!(
            next_event(&session)?,
            AlertEvent::OperationCompleted {
                info_hash: torrent.info_hash,
                operation: TorrentOperation::Add,
            }
        );
        assert!(session.submit_torrent(&torrent).is_err());
        assert_eq!(session.list_handles().len(), 1);
        Ok(())
    }

    #[test]
    fn pause_and_resume_flip_status_and_emit_alerts() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        let torrent = descriptor("debian")?;
        session.submit_torrent(&torrent)?;
        let _ = session.pop_alert();

        let handle = session
            .find_handle(&torrent.info_hash)
            .ok_or_else(|| anyhow!("handle missing"))?;
        handle.pause()?;
        assert!(handle.status().paused);
        assert_eq!(
            next_event(&session)?,
            AlertEvent::StatusChanged {
                info_hash: torrent.info_hash,
                status: TorrentStatusChange::Paused,
            }
        );

        handle.resume()?;
        assert!(!handle.status().paused);
        assert!(matches!(
            next_event(&session)?,
            AlertEvent::StatusChanged {
                status: TorrentStatusChange::Resumed,
                ..
            }
        ));
        assert_eq!(handle.name(), "debian");
        assert_eq!(handle.metainfo().pieces, 1);
        Ok(())
    }

    #[test]
    fn scripted_outcomes_apply_once() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        let torrent = descriptor("arch")?;

        session.reject_next(TorrentOperation::Add, "disk full");
        let err = session
            .submit_torrent(&torrent)
            .err()
            .ok_or_else(|| anyhow!("expected rejection"))?;
        assert!(err.to_string().contains("disk full"));
        assert_eq!(session.pending_alerts(), 0);

        session.fail_next(TorrentOperation::Add, "bad piece length");
        session.submit_torrent(&torrent)?;
        assert!(matches!(
            next_event(&session)?,
            AlertEvent::OperationFailed { operation: TorrentOperation::Add, .. }
        ));
        assert!(session.find_handle(&torrent.info_hash).is_none());

        session.submit_torrent(&torrent)?;
        assert!(session.find_handle(&torrent.info_hash).is_some());
        Ok(())
    }

    #[test]
    fn remove_emits_removal_alert() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        let torrent = descriptor("fedora")?;
        session.submit_torrent(&torrent)?;
        let _ = session.pop_alert();

        session.remove_torrent(&torrent.info_hash)?;
        assert_eq!(
            next_event(&session)?,
            AlertEvent::TorrentRemoved {
                info_hash: torrent.info_hash
            }
        );
        assert!(session.remove_torrent(&torrent.info_hash).is_err());
        Ok(())
    }

    #[test]
    fn full_queue_drops_newest_alerts() {
        let session = MemorySession::new(SessionSettings {
            alert_capacity: 2,
            ..SessionSettings::default()
        });
        let alert = || {
            Alert::new(AlertEvent::Other {
                info_hash: None,
                message: "tick".to_string(),
            })
        };
        assert!(session.push_alert(alert()));
        assert!(session.push_alert(alert()));
        assert!(!session.push_alert(alert()));
        assert_eq!(session.pending_alerts(), 2);
        assert_eq!(session.dropped_alerts(), 1);
    }

    #[test]
    fn resume_data_requests_produce_payload() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        let torrent = descriptor("gentoo")?;
        session.submit_torrent(&torrent)?;
        let _ = session.pop_alert();
        let handle = session
            .find_handle(&torrent.info_hash)
            .ok_or_else(|| anyhow!("handle missing"))?;

        handle.request_resume_data()?;
        match next_event(&session)? {
            AlertEvent::ResumeDataReady { info_hash, payload } => {
                assert_eq!(info_hash, torrent.info_hash);
                let value: serde_json::Value = serde_json::from_slice(&payload)?;
                assert_eq!(value["name"], "gentoo");
            }
            other => return Err(anyhow!("unexpected alert {other:?}")),
        }
        Ok(())
    }

    #[test]
    fn finishing_a_download_emits_status_once() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        let torrent = descriptor("mint")?;
        session.submit_torrent(&torrent)?;
        let _ = session.pop_alert();

        assert!(session.set_transfer(&torrent.info_hash, 0.5, 100, 10));
        assert_eq!(session.pending_alerts(), 0);
        assert!(session.set_transfer(&torrent.info_hash, 1.5, 0, 10));
        assert!(session.set_transfer(&torrent.info_hash, 1.0, 0, 10));
        assert_eq!(session.pending_alerts(), 1);

        let handle = session
            .find_handle(&torrent.info_hash)
            .ok_or_else(|| anyhow!("handle missing"))?;
        assert!((handle.status().progress - 1.0).abs() < f64::EPSILON);
        assert!(!session.set_transfer(&InfoHash::new([0; 20]), 0.1, 0, 0));
        Ok(())
    }

    #[test]
    fn dht_state_round_trips_through_bencode() -> Result<()> {
        let session = MemorySession::new(SessionSettings::default());
        assert!(!session.dht_running());
        assert_eq!(session.start_dht(None)?, 0);
        assert!(session.dht_running());
        let snapshot = session.dht_state()?;

        let restored = MemorySession::new(SessionSettings {
            dht_routers: Vec::new(),
            ..SessionSettings::default()
        });
        assert_eq!(restored.start_dht(Some(snapshot.as_slice()))?, 1);
        assert!(restored.start_dht(Some(b"garbage".as_slice())).is_err());
        Ok(())
    }
}
