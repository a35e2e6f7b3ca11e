//! Torrent operations that pair an engine call with the alert confirming it.
//!
//! # Design
//! - Targets are normalised to an [`InfoHash`] before the engine is touched; a missing torrent
//!   fails immediately and registers nothing.
//! - The waiter is registered and the engine called under the dispatch lock, so the pump
//!   cannot drain the confirming alert before the waiter exists. A rejected call retracts it.
//! - Reads are synchronous snapshots and never create asynchronous state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use rarity_torrent_core::{
    Alert, AlertEvent, EngineSession, InfoHash, MetainfoFetcher, TorrentDescriptor, TorrentError,
    TorrentHandle, TorrentMetainfo, TorrentOperation, TorrentRecord, TorrentRef, TorrentResult,
    TorrentStatusView,
};
use tracing::{debug, warn};

use crate::completion::Completion;
use crate::dispatch::AlertDispatcher;
use crate::error::op_failed;

/// Expiry applied to waiters when callers do not choose one.
pub const DEFAULT_WAITER_EXPIRY: Duration = Duration::from_secs(600);

/// Entry point for every remote-control operation.
#[derive(Clone)]
pub struct TorrentCorrelator {
    session: Arc<dyn EngineSession>,
    dispatcher: AlertDispatcher,
    fetcher: Arc<dyn MetainfoFetcher>,
    expire_after: Duration,
}

impl TorrentCorrelator {
    /// Wire a correlator over an engine session.
    #[must_use]
    pub fn new(
        session: Arc<dyn EngineSession>,
        dispatcher: AlertDispatcher,
        fetcher: Arc<dyn MetainfoFetcher>,
    ) -> Self {
        Self {
            session,
            dispatcher,
            fetcher,
            expire_after: DEFAULT_WAITER_EXPIRY,
        }
    }

    /// Override the default waiter expiry.
    #[must_use]
    pub const fn with_expiry(mut self, expire_after: Duration) -> Self {
        self.expire_after = expire_after;
        self
    }

    /// Expiry used by the operations without a `_within` suffix.
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.expire_after
    }

    /// Dispatcher shared with the alert pump.
    #[must_use]
    pub const fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Number of outstanding waiters.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.dispatcher.pending_waiters()
    }

    /// Fetch a `.torrent` from `url`, submit it, and wait for the engine to confirm.
    ///
    /// # Errors
    ///
    /// [`TorrentError::Transport`] when the fetch fails (no waiter is registered),
    /// [`TorrentError::Parse`] for malformed metainfo, [`TorrentError::Engine`] when the engine
    /// refuses or fails the submission, [`TorrentError::Timeout`] when no confirmation arrives.
    pub async fn add_torrent(&self, url: &str) -> TorrentResult<Alert> {
        self.add_torrent_within(url, self.expire_after).await
    }

    /// [`Self::add_torrent`] with an explicit expiry.
    ///
    /// # Errors
    ///
    /// See [`Self::add_torrent`].
    pub async fn add_torrent_within(
        &self,
        url: &str,
        expire_after: Duration,
    ) -> TorrentResult<Alert> {
        let bytes = self.fetcher.fetch(url).await?;
        self.add_metainfo_within(&bytes, expire_after).await
    }

    /// Submit raw metainfo bytes.
    pub fn add_metainfo(&self, bytes: &[u8]) -> Completion {
        self.add_metainfo_within(bytes, self.expire_after)
    }

    /// [`Self::add_metainfo`] with an explicit expiry.
    pub fn add_metainfo_within(&self, bytes: &[u8], expire_after: Duration) -> Completion {
        let operation = TorrentOperation::Add;
        let descriptor = match TorrentDescriptor::from_bytes(bytes) {
            Ok(descriptor) => descriptor,
            Err(err) => return Completion::failed(operation.as_str(), err),
        };
        self.issue(operation, descriptor.info_hash, expire_after, || {
            self.session.submit_torrent(&descriptor)
        })
    }

    /// Pause a torrent; resolves on the engine's pause notification.
    pub fn pause_torrent(&self, target: impl Into<TorrentRef>) -> Completion {
        self.pause_torrent_within(target, self.expire_after)
    }

    /// [`Self::pause_torrent`] with an explicit expiry.
    pub fn pause_torrent_within(
        &self,
        target: impl Into<TorrentRef>,
        expire_after: Duration,
    ) -> Completion {
        self.mutate(TorrentOperation::Pause, target.into(), expire_after, |handle| {
            handle.pause()
        })
    }

    /// Resume a torrent; resolves on the engine's resume notification.
    pub fn resume_torrent(&self, target: impl Into<TorrentRef>) -> Completion {
        self.resume_torrent_within(target, self.expire_after)
    }

    /// [`Self::resume_torrent`] with an explicit expiry.
    pub fn resume_torrent_within(
        &self,
        target: impl Into<TorrentRef>,
        expire_after: Duration,
    ) -> Completion {
        self.mutate(TorrentOperation::Resume, target.into(), expire_after, |handle| {
            handle.resume()
        })
    }

    /// Remove a torrent; resolves on the engine's removal notification.
    pub fn remove_torrent(&self, target: impl Into<TorrentRef>) -> Completion {
        self.remove_torrent_within(target, self.expire_after)
    }

    /// [`Self::remove_torrent`] with an explicit expiry.
    pub fn remove_torrent_within(
        &self,
        target: impl Into<TorrentRef>,
        expire_after: Duration,
    ) -> Completion {
        self.mutate(TorrentOperation::Remove, target.into(), expire_after, |handle| {
            self.session.remove_torrent(&handle.info_hash())
        })
    }

    /// Ask the engine for a resume blob; resolves when the blob is ready.
    pub fn save_resume_data(&self, target: impl Into<TorrentRef>) -> Completion {
        self.mutate(
            TorrentOperation::SaveResumeData,
            target.into(),
            self.expire_after,
            |handle| handle.request_resume_data(),
        )
    }

    /// Records for every torrent whose name contains a match for `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidPattern`] when `pattern` is not a valid expression.
    pub fn find_torrents(&self, pattern: &str) -> TorrentResult<BTreeMap<InfoHash, TorrentRecord>> {
        let matcher = Regex::new(pattern).map_err(|err| TorrentError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(self
            .session
            .list_handles()
            .into_iter()
            .filter(|handle| matcher.is_match(&handle.name()))
            .map(|handle| (handle.info_hash(), handle.record()))
            .collect())
    }

    /// Status of every torrent.
    #[must_use]
    pub fn torrent_state(&self) -> BTreeMap<InfoHash, TorrentStatusView> {
        self.session
            .list_handles()
            .into_iter()
            .map(|handle| (handle.info_hash(), handle.status().normalised()))
            .collect()
    }

    /// Metainfo of every torrent.
    #[must_use]
    pub fn torrent_metainfo(&self) -> BTreeMap<InfoHash, TorrentMetainfo> {
        self.session
            .list_handles()
            .into_iter()
            .map(|handle| (handle.info_hash(), handle.metainfo()))
            .collect()
    }

    /// Status of one torrent.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::NotFound`] when the torrent is not in the session.
    pub fn torrent_info(&self, target: impl Into<TorrentRef>) -> TorrentResult<TorrentStatusView> {
        Ok(self.locate(&target.into())?.status().normalised())
    }

    /// Metainfo of one torrent.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::NotFound`] when the torrent is not in the session.
    pub fn torrent_metainfo_of(
        &self,
        target: impl Into<TorrentRef>,
    ) -> TorrentResult<TorrentMetainfo> {
        Ok(self.locate(&target.into())?.metainfo())
    }

    /// Display name of one torrent.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::NotFound`] when the torrent is not in the session.
    pub fn torrent_name(&self, target: impl Into<TorrentRef>) -> TorrentResult<String> {
        Ok(self.locate(&target.into())?.name())
    }

    /// Combined record of one torrent.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::NotFound`] when the torrent is not in the session.
    pub fn torrent_record(&self, target: impl Into<TorrentRef>) -> TorrentResult<TorrentRecord> {
        Ok(self.locate(&target.into())?.record())
    }

    fn locate(&self, target: &TorrentRef) -> TorrentResult<Arc<dyn TorrentHandle>> {
        let info_hash = target.info_hash()?;
        self.session
            .find_handle(&info_hash)
            .ok_or_else(|| TorrentError::not_found(&info_hash))
    }

    fn mutate<F>(
        &self,
        operation: TorrentOperation,
        target: TorrentRef,
        expire_after: Duration,
        call: F,
    ) -> Completion
    where
        F: FnOnce(&dyn TorrentHandle) -> anyhow::Result<()>,
    {
        let handle = match self.locate(&target) {
            Ok(handle) => handle,
            Err(err) => {
                debug!(operation = %operation, target = ?target, "torrent not in session");
                return Completion::failed(operation.as_str(), err);
            }
        };
        self.issue(operation, handle.info_hash(), expire_after, || {
            call(handle.as_ref())
        })
    }

    fn issue<F>(
        &self,
        operation: TorrentOperation,
        info_hash: InfoHash,
        expire_after: Duration,
        call: F,
    ) -> Completion
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        let mut state = self.dispatcher.lock();
        let ticket = state.registry.register(
            confirmation(operation, info_hash),
            expire_after,
            Instant::now(),
        );
        if let Err(err) = call() {
            self.dispatcher.retract(&mut state, ticket.id());
            self.dispatcher.publish_pending(&state);
            warn!(
                operation = %operation,
                info_hash = %info_hash,
                error = %err,
                "engine rejected torrent operation"
            );
            return Completion::failed(
                operation.as_str(),
                op_failed(operation.as_str(), Some(info_hash), err),
            );
        }
        self.dispatcher.publish_pending(&state);
        debug!(
            operation = %operation,
            info_hash = %info_hash,
            waiter = %ticket.id(),
            "awaiting engine confirmation"
        );
        Completion::waiting(operation.as_str(), ticket)
    }
}

fn confirmation(
    operation: TorrentOperation,
    info_hash: InfoHash,
) -> impl Fn(&Alert) -> bool + Send + 'static {
    move |alert| {
        alert.info_hash() == Some(info_hash)
            && (operation.is_confirmed_by(&alert.event)
                || matches!(
                    &alert.event,
                    AlertEvent::OperationFailed { operation: failed, .. } if *failed == operation
                ))
    }
}
