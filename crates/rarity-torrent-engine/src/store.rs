//! File-backed resume-state store: one `<info-hash>.fastresume` file per torrent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rarity_torrent_core::{InfoHash, ResumeStateStore, TorrentError, TorrentResult};

const FASTRESUME_EXTENSION: &str = "fastresume";
const TEMP_SUFFIX: &str = "tmp";

/// Directory of resume blobs keyed by info-hash.
#[derive(Debug, Clone)]
pub struct FastResumeStore {
    root: PathBuf,
}

impl FastResumeStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the blobs.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the backing directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::Storage`] when the directory cannot be created.
    pub fn ensure_initialized(&self) -> TorrentResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| storage("init", &self.root, source))
    }

    /// Path of the blob for `info_hash`.
    #[must_use]
    pub fn path_for(&self, info_hash: &InfoHash) -> PathBuf {
        self.root
            .join(format!("{}.{FASTRESUME_EXTENSION}", info_hash.to_hex()))
    }

    /// Identifiers of every stored blob, sorted. Files that are not named after an
    /// info-hash are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::Storage`] when the directory cannot be read.
    pub fn list(&self) -> TorrentResult<Vec<InfoHash>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(storage("list", &self.root, err)),
        };
        let mut hashes = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| storage("list", &self.root, source))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FASTRESUME_EXTENSION) {
                continue;
            }
            if let Some(info_hash) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<InfoHash>().ok())
            {
                hashes.push(info_hash);
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}

impl ResumeStateStore for FastResumeStore {
    fn put(&self, info_hash: &InfoHash, payload: &[u8]) -> TorrentResult<()> {
        self.ensure_initialized()?;
        let target = self.path_for(info_hash);
        let staging = target.with_extension(format!("{FASTRESUME_EXTENSION}.{TEMP_SUFFIX}"));
        fs::write(&staging, payload).map_err(|source| storage("write", &staging, source))?;
        fs::rename(&staging, &target).map_err(|source| storage("rename", &target, source))
    }

    fn get(&self, info_hash: &InfoHash) -> TorrentResult<Vec<u8>> {
        let path = self.path_for(info_hash);
        fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                TorrentError::not_found(info_hash)
            } else {
                storage("read", &path, source)
            }
        })
    }

    fn remove(&self, info_hash: &InfoHash) -> TorrentResult<()> {
        let path = self.path_for(info_hash);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage("remove", &path, err)),
        }
    }
}

fn storage(operation: &'static str, path: &Path, source: io::Error) -> TorrentError {
    TorrentError::Storage {
        operation,
        path: path.to_path_buf(),
        source,
    }
}
