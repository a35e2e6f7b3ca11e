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

//! HTTP/JSON RPC surface over the torrent correlator.
//!
//! Layout: `http/router.rs` (`ApiServer`), `http/rpc.rs` (procedure handlers),
//! `http/health.rs` (health and Prometheus endpoints), `http/errors.rs` (problem documents),
//! `http/telemetry.rs` (per-procedure request metrics), `error.rs` (server errors).

pub mod error;
pub mod http;
mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
