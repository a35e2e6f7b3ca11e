#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Engine-agnostic torrent identifiers, alerts, views, and collaborator traits.
//!
//! Layout: `info_hash.rs` (canonical identifier), `alert.rs` (engine notifications),
//! `metainfo.rs` (`.torrent` parsing), `model.rs` (status/metainfo views),
//! `session.rs` (engine, handle, store, and fetcher seams), `error.rs` (error taxonomy).

pub mod alert;
pub mod error;
pub mod info_hash;
pub mod metainfo;
pub mod model;
pub mod session;

pub use alert::{Alert, AlertEvent, AlertKind, TorrentOperation, TorrentStatusChange};
pub use error::{TorrentError, TorrentResult};
pub use info_hash::{InfoHash, TorrentRef};
pub use metainfo::{TorrentDescriptor, TorrentFile};
pub use model::{TorrentMetainfo, TorrentRecord, TorrentStatusView};
pub use session::{EngineSession, MetainfoFetcher, ResumeStateStore, TorrentHandle};
