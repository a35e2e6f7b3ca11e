//! Engine session implementations.

mod memory;

pub use memory::{DEFAULT_ALERT_CAPACITY, MemoryHandle, MemorySession, SessionSettings};
