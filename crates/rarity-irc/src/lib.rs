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
#![allow(clippy::redundant_pub_crate)]

//! IRC bridge forwarding chat commands to a Rarity RPC server.
//!
//! Layout:
//! - `cli.rs`: argument parsing, exit codes, and connection setup
//! - `session.rs`: registration, keepalive, and the read/write loop
//! - `protocol.rs`: IRC line codec and hostmask parsing
//! - `command.rs`: chat command grammar
//! - `bot.rs`: command execution and reply formatting
//! - `client.rs`: RPC client and problem-document classification
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod bot;
pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod command;
pub(crate) mod protocol;
pub(crate) mod session;

pub use cli::run;

#[cfg(test)]
pub(crate) mod testing;
