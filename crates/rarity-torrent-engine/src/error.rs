//! # Design
//!
//! - Centralize engine adapter error context without leaking `anyhow` into public results.
//! - Keep error messages constant; store operational context in fields.
//! - Provide helpers to build `TorrentError` with structured sources.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use rarity_torrent_core::{InfoHash, TorrentError};

#[derive(Debug)]
/// Internal error details raised by the engine session and the fetcher.
pub enum SessionError {
    /// The session holds no torrent with this identifier.
    UnknownTorrent {
        /// Identifier that was requested.
        info_hash: InfoHash,
    },
    /// The torrent is already part of the session.
    DuplicateTorrent {
        /// Identifier that was submitted twice.
        info_hash: InfoHash,
    },
    /// The session refused the request synchronously.
    Rejected {
        /// Operation that was refused.
        operation: &'static str,
        /// Engine diagnostic.
        message: String,
    },
    /// The engine reported failure through an alert after accepting the request.
    AlertFailure {
        /// Engine diagnostic carried by the alert.
        message: String,
    },
    /// A persisted DHT snapshot could not be decoded or encoded.
    DhtSnapshot {
        /// Underlying bencode error.
        source: serde_bencode::Error,
    },
    /// A fetched body exceeded the configured size cap.
    BodyTooLarge {
        /// Maximum accepted size in bytes.
        limit: usize,
    },
}

impl Display for SessionError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTorrent { info_hash } => {
                let _ = info_hash;
                formatter.write_str("torrent not present in session")
            }
            Self::DuplicateTorrent { info_hash } => {
                let _ = info_hash;
                formatter.write_str("torrent already present in session")
            }
            Self::Rejected { operation, message } => {
                let _ = operation;
                write!(formatter, "engine rejected the request: {message}")
            }
            Self::AlertFailure { message } => {
                write!(formatter, "engine reported failure: {message}")
            }
            Self::DhtSnapshot { .. } => formatter.write_str("dht snapshot could not be processed"),
            Self::BodyTooLarge { limit } => {
                let _ = limit;
                formatter.write_str("response body exceeded size limit")
            }
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DhtSnapshot { source } => Some(source),
            _ => None,
        }
    }
}

/// Build a torrent error with structured operation context.
pub fn op_failed(
    operation: &'static str,
    info_hash: Option<InfoHash>,
    source: impl Into<Box<dyn Error + Send + Sync>>,
) -> TorrentError {
    TorrentError::Engine {
        operation,
        info_hash,
        source: source.into(),
    }
}
