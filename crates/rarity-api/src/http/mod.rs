//! HTTP surface: routing, handlers, errors, and middleware.

pub(crate) mod constants;
pub(crate) mod errors;
pub(crate) mod health;
pub mod router;
pub(crate) mod rpc;
pub(crate) mod telemetry;
