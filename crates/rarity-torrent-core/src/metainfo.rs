//! `.torrent` metainfo parsing and info-hash derivation.
//!
//! # Design
//! - Field extraction goes through `serde_bencode`'s dynamic value tree.
//! - The info-hash is the SHA-1 of the raw `info` span as it appears in the input, located
//!   by walking the top-level dictionary; re-encoding would change the digest for inputs
//!   whose keys are not canonically ordered.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

use crate::error::{TorrentError, TorrentResult};
use crate::info_hash::{INFO_HASH_LEN, InfoHash};
use crate::model::TorrentMetainfo;

const PIECE_HASH_LEN: usize = 20;
const MAX_NESTING: usize = 64;

type BencodeDict = HashMap<Vec<u8>, Value>;

/// File entry inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path components relative to the torrent root.
    pub path: Vec<String>,
    /// File length in bytes.
    pub length: u64,
}

/// Parsed torrent description ready to submit to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentDescriptor {
    /// SHA-1 over the raw `info` dictionary.
    pub info_hash: InfoHash,
    /// Display name from `info.name`.
    pub name: String,
    /// Piece length in bytes.
    pub piece_length: u64,
    /// Number of pieces.
    pub piece_count: u32,
    /// Sum of file lengths.
    pub total_length: u64,
    /// `info.private == 1`.
    pub private: bool,
    /// Tracker URLs from `announce` and `announce-list`, deduplicated in order.
    pub announce_urls: Vec<String>,
    /// File list; single-file torrents carry one entry named after the torrent.
    pub files: Vec<TorrentFile>,
}

impl TorrentDescriptor {
    /// Parse bencoded metainfo bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::Parse`] when the input is not bencode, lacks required
    /// `info` fields, or carries a malformed piece table.
    pub fn from_bytes(bytes: &[u8]) -> TorrentResult<Self> {
        let root: Value = serde_bencode::from_bytes(bytes)
            .map_err(|err| TorrentError::parse(format!("invalid bencode: {err}")))?;
        let Value::Dict(root) = root else {
            return Err(TorrentError::parse("root element must be a dictionary"));
        };
        let Some(Value::Dict(info)) = root.get(b"info".as_slice()) else {
            return Err(TorrentError::parse("missing or invalid 'info' dictionary"));
        };

        let info_hash = hash_info_span(bytes)?;
        let name = utf8_field(info, b"name")?;
        let piece_length = non_negative(integer_field(info, b"piece length")?, "piece length")?;
        let pieces = bytes_field(info, b"pieces")?;
        if !pieces.len().is_multiple_of(PIECE_HASH_LEN) {
            return Err(TorrentError::parse(
                "'pieces' length is not a multiple of 20",
            ));
        }
        let piece_count = u32::try_from(pieces.len() / PIECE_HASH_LEN)
            .map_err(|_| TorrentError::parse("too many pieces"))?;
        let private = matches!(info.get(b"private".as_slice()), Some(Value::Int(1)));

        let (files, total_length) = match info.get(b"length".as_slice()) {
            Some(Value::Int(length)) => {
                let length = non_negative(*length, "length")?;
                (
                    vec![TorrentFile {
                        path: vec![name.clone()],
                        length,
                    }],
                    length,
                )
            }
            _ => extract_files(info)?,
        };

        Ok(Self {
            info_hash,
            name,
            piece_length,
            piece_count,
            total_length,
            private,
            announce_urls: extract_announce_urls(&root),
            files,
        })
    }

    /// Metainfo view of the descriptor.
    #[must_use]
    pub fn metainfo(&self) -> TorrentMetainfo {
        TorrentMetainfo {
            name: self.name.clone(),
            pieces: self.piece_count,
            private: self.private,
        }
    }
}

fn hash_info_span(bytes: &[u8]) -> TorrentResult<InfoHash> {
    let span = info_span(bytes).map_err(TorrentError::parse)?;
    let digest = Sha1::digest(span);
    let mut hash = [0u8; INFO_HASH_LEN];
    hash.copy_from_slice(&digest);
    Ok(InfoHash::new(hash))
}

/// Locate the raw bytes of the top-level `info` value.
fn info_span(bytes: &[u8]) -> Result<&[u8], String> {
    if bytes.first() != Some(&b'd') {
        return Err("expected dictionary start".to_string());
    }
    let mut pos = 1;
    while bytes.get(pos) != Some(&b'e') {
        let (key_start, key_end) = string_span(bytes, pos)?;
        let end = value_end(bytes, key_end, 0)?;
        if &bytes[key_start..key_end] == b"info" {
            return Ok(&bytes[key_end..end]);
        }
        pos = end;
    }
    Err("missing 'info' dictionary".to_string())
}

/// Returns the `(start, end)` of a byte string's contents starting at `pos`.
fn string_span(bytes: &[u8], pos: usize) -> Result<(usize, usize), String> {
    let colon = bytes[pos..]
        .iter()
        .position(|byte| *byte == b':')
        .map(|offset| pos + offset)
        .ok_or_else(|| "unterminated string length".to_string())?;
    let length: usize = std::str::from_utf8(&bytes[pos..colon])
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| "invalid string length".to_string())?;
    let start = colon + 1;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| "string runs past end of input".to_string())?;
    Ok((start, end))
}

fn value_end(bytes: &[u8], pos: usize, depth: usize) -> Result<usize, String> {
    if depth > MAX_NESTING {
        return Err("bencode nesting too deep".to_string());
    }
    match bytes.get(pos) {
        Some(b'i') => bytes[pos..]
            .iter()
            .position(|byte| *byte == b'e')
            .map(|offset| pos + offset + 1)
            .ok_or_else(|| "unterminated integer".to_string()),
        Some(b'l') => {
            let mut cursor = pos + 1;
            while bytes.get(cursor) != Some(&b'e') {
                if cursor >= bytes.len() {
                    return Err("unterminated list".to_string());
                }
                cursor = value_end(bytes, cursor, depth + 1)?;
            }
            Ok(cursor + 1)
        }
        Some(b'd') => {
            let mut cursor = pos + 1;
            while bytes.get(cursor) != Some(&b'e') {
                if cursor >= bytes.len() {
                    return Err("unterminated dictionary".to_string());
                }
                let (_, key_end) = string_span(bytes, cursor)?;
                cursor = value_end(bytes, key_end, depth + 1)?;
            }
            Ok(cursor + 1)
        }
        Some(b'0'..=b'9') => string_span(bytes, pos).map(|(_, end)| end),
        Some(_) => Err("invalid bencode character".to_string()),
        None => Err("unexpected end of input".to_string()),
    }
}

fn bytes_field<'a>(dict: &'a BencodeDict, key: &[u8]) -> TorrentResult<&'a [u8]> {
    match dict.get(key) {
        Some(Value::Bytes(bytes)) => Ok(bytes),
        _ => Err(TorrentError::parse(format!(
            "missing or invalid field '{}'",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn utf8_field(dict: &BencodeDict, key: &[u8]) -> TorrentResult<String> {
    let bytes = bytes_field(dict, key)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        TorrentError::parse(format!(
            "field '{}' is not valid UTF-8",
            String::from_utf8_lossy(key)
        ))
    })
}

fn integer_field(dict: &BencodeDict, key: &[u8]) -> TorrentResult<i64> {
    match dict.get(key) {
        Some(Value::Int(value)) => Ok(*value),
        _ => Err(TorrentError::parse(format!(
            "missing or invalid integer '{}'",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn non_negative(value: i64, field: &str) -> TorrentResult<u64> {
    u64::try_from(value).map_err(|_| TorrentError::parse(format!("'{field}' is negative")))
}

fn extract_files(info: &BencodeDict) -> TorrentResult<(Vec<TorrentFile>, u64)> {
    let Some(Value::List(entries)) = info.get(b"files".as_slice()) else {
        return Err(TorrentError::parse("missing 'length' or 'files'"));
    };

    let mut files = Vec::with_capacity(entries.len());
    let mut total_length = 0u64;
    for entry in entries {
        let Value::Dict(entry) = entry else {
            return Err(TorrentError::parse("file entry must be a dictionary"));
        };
        let length = non_negative(integer_field(entry, b"length")?, "length")?;
        let Some(Value::List(components)) = entry.get(b"path".as_slice()) else {
            return Err(TorrentError::parse("file entry missing 'path'"));
        };
        let path = components
            .iter()
            .map(|component| match component {
                Value::Bytes(bytes) => String::from_utf8(bytes.clone())
                    .map_err(|_| TorrentError::parse("file path is not valid UTF-8")),
                _ => Err(TorrentError::parse("file path component must be a string")),
            })
            .collect::<TorrentResult<Vec<_>>>()?;
        total_length = total_length.saturating_add(length);
        files.push(TorrentFile { path, length });
    }
    Ok((files, total_length))
}

fn extract_announce_urls(root: &BencodeDict) -> Vec<String> {
    let mut urls = Vec::new();
    let mut push = |bytes: &[u8]| {
        if let Ok(url) = std::str::from_utf8(bytes)
            && !urls.iter().any(|known| known == url)
        {
            urls.push(url.to_string());
        }
    };

    if let Some(Value::Bytes(announce)) = root.get(b"announce".as_slice()) {
        push(announce);
    }
    if let Some(Value::List(tiers)) = root.get(b"announce-list".as_slice()) {
        for tier in tiers {
            if let Value::List(tier) = tier {
                for url in tier {
                    if let Value::Bytes(url) = url {
                        push(url);
                    }
                }
            }
        }
    }
    urls
}
