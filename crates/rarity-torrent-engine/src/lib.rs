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

//! Alert correlation for a torrent engine session.
//!
//! Layout: `registry.rs` (one-shot waiters), `handlers.rs` (standing handlers),
//! `dispatch.rs` (shared lock around both), `pump.rs` (periodic drain),
//! `completion.rs` (awaitable operation result), `correlator.rs` (public operations),
//! `session/` (in-process engine), `store.rs` (resume blobs on disk),
//! `fetch.rs` (HTTP metainfo retrieval), `health.rs` (degraded components).

pub mod completion;
pub mod correlator;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod health;
pub mod pump;
pub mod registry;
pub mod session;
pub mod store;

pub use completion::Completion;
pub use correlator::{DEFAULT_WAITER_EXPIRY, TorrentCorrelator};
pub use dispatch::{AlertDispatcher, AlertOutcome, DispatchState};
pub use error::{SessionError, op_failed};
pub use fetch::{DEFAULT_FETCH_TIMEOUT, HttpFetcher, MAX_METAINFO_BYTES};
pub use handlers::{HandlerFailure, HandlerReport, StaticHandlerTable};
pub use health::EngineHealth;
pub use pump::{AlertPump, DEFAULT_POLL_INTERVAL, TickSummary};
pub use registry::{WaiterId, WaiterRegistry, WaiterTicket};
pub use session::{DEFAULT_ALERT_CAPACITY, MemoryHandle, MemorySession, SessionSettings};
pub use store::FastResumeStore;
