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

//! Environment-driven configuration for the Rarity daemon.
//!
//! Layout: `model.rs` (typed sections and defaults), `loader.rs` (`RARITY_*` parsing),
//! `error.rs` (validation errors).

pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ApiSettings, AppConfig, DEFAULT_DHT_ROUTER, DEFAULT_HTTP_PORT, DEFAULT_LISTEN_PORT,
    EngineSettings, LogSettings, ScheduleSettings,
};
