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

//! Rarity daemon bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring and shutdown), `dht.rs` (DHT snapshot persistence),
//! `error.rs` (application errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// DHT routing-table snapshot persistence.
pub mod dht;
/// Application-level errors.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
