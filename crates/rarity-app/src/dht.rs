//! DHT routing-table snapshot persistence.
//!
//! # Design
//! - The snapshot is an opaque engine blob; this module only moves it between the session and disk.
//! - Writes go to a sibling temp file and are renamed into place so a crash never leaves a torn
//!   snapshot.
//! - A missing snapshot starts the DHT empty; an unreadable one is logged and also starts empty.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rarity_torrent_core::EngineSession;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Moves DHT state between the engine session and a snapshot file.
#[derive(Clone)]
pub struct DhtPersistence {
    session: Arc<dyn EngineSession>,
    path: PathBuf,
}

impl DhtPersistence {
    /// Persist `session`'s DHT state at `path`.
    #[must_use]
    pub fn new(session: Arc<dyn EngineSession>, path: impl Into<PathBuf>) -> Self {
        Self {
            session,
            path: path.into(),
        }
    }

    /// Snapshot location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> AppResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::io("dht.load", &self.path, err)),
        }
    }

    /// Start the session's DHT from the stored snapshot and return the restored node count.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or the session refuses to start the DHT
    /// even without a snapshot.
    pub fn start(&self) -> AppResult<usize> {
        let Some(snapshot) = self.load()? else {
            info!(path = %self.path.display(), "no dht snapshot found; starting empty");
            return self
                .session
                .start_dht(None)
                .map_err(|err| AppError::engine("dht.start", err));
        };
        match self.session.start_dht(Some(snapshot.as_slice())) {
            Ok(nodes) => {
                info!(path = %self.path.display(), nodes, "dht started from snapshot");
                Ok(nodes)
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "dht snapshot rejected; starting empty"
                );
                self.session
                    .start_dht(None)
                    .map_err(|err| AppError::engine("dht.start", err))
            }
        }
    }

    /// Write the session's current DHT state to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot produce a snapshot or the write fails.
    pub fn save(&self) -> AppResult<()> {
        let snapshot = self
            .session
            .dht_state()
            .map_err(|err| AppError::engine("dht.state", err))?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| AppError::io("dht.mkdir", parent, err))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, &snapshot).map_err(|err| AppError::io("dht.write", &staging, err))?;
        fs::rename(&staging, &self.path)
            .map_err(|err| AppError::io("dht.rename", &self.path, err))?;
        debug!(path = %self.path.display(), bytes = snapshot.len(), "dht snapshot written");
        Ok(())
    }

    /// Save once after `initial_delay`, then every `every`, until `shutdown` flips to `true` or
    /// its sender drops. Failures are logged and retried on the next tick.
    pub fn spawn_periodic(
        self,
        initial_delay: Duration,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + initial_delay;
            let mut ticker = interval_at(start, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.save() {
                            warn!(path = %self.path.display(), error = ?err, "periodic dht save failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("dht persistence task stopped");
        })
    }
}
