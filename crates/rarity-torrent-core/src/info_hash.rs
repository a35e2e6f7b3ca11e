//! Canonical torrent identifier and the handle-or-hash boundary type.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TorrentError;
use crate::session::TorrentHandle;

/// Length of a v1 info-hash in bytes.
pub const INFO_HASH_LEN: usize = 20;

/// SHA-1 digest of a torrent's bencoded `info` dictionary.
///
/// The canonical textual form is 40 lowercase hex characters. Parsing accepts either
/// case; ordering over the bytes matches ordering over the canonical text, so the type
/// is usable directly as a sorted map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; INFO_HASH_LEN]);

impl InfoHash {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn new(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; INFO_HASH_LEN] {
        &self.0
    }

    /// Canonical lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for InfoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for InfoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({self})")
    }
}

impl FromStr for InfoHash {
    type Err = TorrentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.len() != INFO_HASH_LEN * 2 {
            return Err(TorrentError::InvalidInfoHash {
                value: value.to_string(),
            });
        }
        let mut bytes = [0u8; INFO_HASH_LEN];
        hex::decode_to_slice(trimmed, &mut bytes).map_err(|_| TorrentError::InvalidInfoHash {
            value: value.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; INFO_HASH_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| D::Error::custom("expected 40 hex characters"))
    }
}

/// Caller-supplied torrent reference: an identifier, its text, or a live engine handle.
///
/// Every correlator operation normalises this to an [`InfoHash`] before touching the engine.
#[derive(Clone)]
pub enum TorrentRef {
    /// Canonical identifier.
    Hash(InfoHash),
    /// Textual identifier as received from a remote caller.
    Text(String),
    /// Live engine handle.
    Handle(Arc<dyn TorrentHandle>),
}

impl TorrentRef {
    /// Normalise to the canonical identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::NotFound`] when text does not form an info-hash: no live
    /// torrent can be addressed by it.
    pub fn info_hash(&self) -> Result<InfoHash, TorrentError> {
        match self {
            Self::Hash(info_hash) => Ok(*info_hash),
            Self::Handle(handle) => Ok(handle.info_hash()),
            Self::Text(text) => text.parse().map_err(|_| TorrentError::NotFound {
                info_hash: text.trim().to_ascii_lowercase(),
            }),
        }
    }
}

impl Debug for TorrentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(info_hash) => f.debug_tuple("Hash").field(info_hash).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Handle(handle) => f.debug_tuple("Handle").field(&handle.info_hash()).finish(),
        }
    }
}

impl From<InfoHash> for TorrentRef {
    fn from(value: InfoHash) -> Self {
        Self::Hash(value)
    }
}

impl From<&InfoHash> for TorrentRef {
    fn from(value: &InfoHash) -> Self {
        Self::Hash(*value)
    }
}

impl From<Arc<dyn TorrentHandle>> for TorrentRef {
    fn from(value: Arc<dyn TorrentHandle>) -> Self {
        Self::Handle(value)
    }
}

impl From<&str> for TorrentRef {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TorrentRef {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
