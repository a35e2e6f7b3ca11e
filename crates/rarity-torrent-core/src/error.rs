//! # Design
//!
//! - One error taxonomy shared by the correlator, the RPC surface, and the chat bridge.
//! - Keep error messages constant; store operational context in fields.
//! - Preserve engine and transport sources without re-logging at call sites.

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::info_hash::InfoHash;

/// Primary error type for torrent operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Torrent metainfo bytes were malformed.
    #[error("torrent metainfo could not be parsed")]
    Parse {
        /// Human-readable parse failure.
        reason: String,
    },
    /// No live torrent matched the requested identifier.
    #[error("torrent not found")]
    NotFound {
        /// Identifier the caller supplied, canonicalised where possible.
        info_hash: String,
    },
    /// The engine rejected or failed a mutating call.
    #[error("torrent engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent the operation targeted, when known.
        info_hash: Option<InfoHash>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No confirming alert arrived inside the expiry window.
    #[error("timed out waiting for torrent alert")]
    Timeout {
        /// Expiry window the waiter was registered with.
        expire_after: Duration,
    },
    /// Fetching metainfo bytes failed before any engine interaction.
    #[error("failed to fetch torrent metainfo")]
    Transport {
        /// Locator that was requested.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Text could not be interpreted as an info-hash.
    #[error("invalid info-hash")]
    InvalidInfoHash {
        /// Offending value.
        value: String,
    },
    /// A name filter was not a valid regular expression.
    #[error("invalid torrent name pattern")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
    /// The pending operation was abandoned before it resolved.
    #[error("torrent operation cancelled")]
    Cancelled {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Resume-state persistence failed.
    #[error("resume state storage failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl TorrentError {
    /// Build a [`TorrentError::NotFound`] for a canonical info-hash.
    #[must_use]
    pub fn not_found(info_hash: &InfoHash) -> Self {
        Self::NotFound {
            info_hash: info_hash.to_string(),
        }
    }

    /// Build a [`TorrentError::Parse`] from any displayable reason.
    #[must_use]
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Render the error together with its context fields for surfaces that only carry text.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Parse { reason } => format!("{self}: {reason}"),
            Self::NotFound { info_hash } => format!("{self}: {info_hash}"),
            Self::Engine {
                operation, source, ..
            } => format!("{self} ({operation}): {source}"),
            Self::Timeout { expire_after } => {
                format!("{self} after {}s", expire_after.as_secs())
            }
            Self::Transport { url, source } => format!("{self} from {url}: {source}"),
            Self::InvalidInfoHash { value } => format!("{self}: {value}"),
            Self::InvalidPattern { pattern, reason } => format!("{self} '{pattern}': {reason}"),
            Self::Cancelled { operation } => format!("{self} ({operation})"),
            Self::Storage {
                operation,
                path,
                source,
            } => format!("{self} ({operation} {}): {source}", path.display()),
        }
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_constant_while_detail_carries_context() {
        let err = TorrentError::NotFound {
            info_hash: "deadbeef".to_string(),
        };
        assert_eq!(err.to_string(), "torrent not found");
        assert_eq!(err.detail(), "torrent not found: deadbeef");

        let err = TorrentError::Timeout {
            expire_after: Duration::from_secs(600),
        };
        assert_eq!(err.detail(), "timed out waiting for torrent alert after 600s");
    }

    #[test]
    fn engine_and_transport_errors_expose_sources() {
        let engine = TorrentError::Engine {
            operation: "pause_torrent",
            info_hash: None,
            source: "session closed".into(),
        };
        assert_eq!(
            engine.source().map(ToString::to_string).as_deref(),
            Some("session closed")
        );

        let transport = TorrentError::Transport {
            url: "http://tracker.invalid/a.torrent".to_string(),
            source: Box::new(io::Error::other("connection refused")),
        };
        assert!(transport.source().is_some());
        assert!(transport.detail().contains("tracker.invalid"));
    }
}
