//! Standing alert handlers that run for every alert, independent of any waiter.
//!
//! # Design
//! - Handlers are registered once and invoked in registration order.
//! - A failing or panicking handler is logged and reported; it never prevents later handlers
//!   or the waiter dispatch from running.
//! - Each handler names the engine component it exercises so failures feed health tracking.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use rarity_torrent_core::{
    Alert, AlertEvent, EngineSession, ResumeStateStore, TorrentStatusChange,
};
use tracing::warn;

/// Name of the handler persisting resume blobs.
pub const PERSIST_RESUME_DATA: &str = "persist_resume_data";
/// Name of the handler requesting resume blobs after a pause.
pub const REQUEST_RESUME_DATA_ON_PAUSE: &str = "request_resume_data_on_pause";
/// Name of the handler discarding resume blobs of removed torrents.
pub const DISCARD_RESUME_DATA: &str = "discard_resume_data";

/// Health component backing the resume-data store.
pub const COMPONENT_RESUME_STORE: &str = "resume_store";
/// Health component backing the engine session.
pub const COMPONENT_SESSION: &str = "session";

type AlertFilter = Box<dyn Fn(&Alert) -> bool + Send>;
type AlertAction = Box<dyn Fn(&Alert) -> Result<()> + Send>;

struct StaticHandler {
    name: &'static str,
    component: &'static str,
    filter: AlertFilter,
    action: AlertAction,
}

/// A handler invocation that did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Handler name.
    pub handler: &'static str,
    /// Component the handler exercises.
    pub component: &'static str,
    /// Error or panic message.
    pub detail: String,
}

/// Result of running the table against one alert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerReport {
    /// Components whose handlers ran successfully.
    pub succeeded: Vec<&'static str>,
    /// Handlers that returned an error or panicked.
    pub failures: Vec<HandlerFailure>,
}

impl HandlerReport {
    /// Number of handlers that ran, successful or not.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }
}

/// Process-lifetime table of (filter, action) pairs.
#[derive(Default)]
pub struct StaticHandlerTable {
    handlers: Vec<StaticHandler>,
}

impl StaticHandlerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. There is no removal.
    pub fn register<F, A>(
        &mut self,
        name: &'static str,
        component: &'static str,
        filter: F,
        action: A,
    ) where
        F: Fn(&Alert) -> bool + Send + 'static,
        A: Fn(&Alert) -> Result<()> + Send + 'static,
    {
        self.handlers.push(StaticHandler {
            name,
            component,
            filter: Box::new(filter),
            action: Box::new(action),
        });
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler whose filter accepts `alert`.
    pub fn dispatch(&self, alert: &Alert) -> HandlerReport {
        let mut report = HandlerReport::default();
        for handler in &self.handlers {
            if !(handler.filter)(alert) {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (handler.action)(alert)));
            let detail = match outcome {
                Ok(Ok(())) => {
                    report.succeeded.push(handler.component);
                    continue;
                }
                Ok(Err(err)) => format!("{err:#}"),
                Err(payload) => format!("handler panicked: {}", panic_message(payload.as_ref())),
            };
            warn!(
                handler = handler.name,
                component = handler.component,
                kind = %alert.kind(),
                detail = %detail,
                "alert handler failed"
            );
            report.failures.push(HandlerFailure {
                handler: handler.name,
                component: handler.component,
                detail,
            });
        }
        report
    }

    /// Register the handlers every daemon runs. Resume blobs are persisted as they arrive, a
    /// fresh blob is requested whenever a torrent pauses, and removal discards the stored blob.
    pub fn install_standing_handlers(
        &mut self,
        session: Arc<dyn EngineSession>,
        store: Arc<dyn ResumeStateStore>,
    ) {
        let persist = Arc::clone(&store);
        self.register(
            PERSIST_RESUME_DATA,
            COMPONENT_RESUME_STORE,
            |alert| matches!(alert.event, AlertEvent::ResumeDataReady { .. }),
            move |alert| {
                if let AlertEvent::ResumeDataReady { info_hash, payload } = &alert.event {
                    persist.put(info_hash, payload)?;
                }
                Ok(())
            },
        );
        self.register(
            DISCARD_RESUME_DATA,
            COMPONENT_RESUME_STORE,
            |alert| matches!(alert.event, AlertEvent::TorrentRemoved { .. }),
            move |alert| {
                if let AlertEvent::TorrentRemoved { info_hash } = &alert.event {
                    store.remove(info_hash)?;
                }
                Ok(())
            },
        );
        self.register(
            REQUEST_RESUME_DATA_ON_PAUSE,
            COMPONENT_SESSION,
            |alert| {
                matches!(
                    alert.event,
                    AlertEvent::StatusChanged {
                        status: TorrentStatusChange::Paused,
                        ..
                    }
                )
            },
            move |alert| {
                let Some(info_hash) = alert.info_hash() else {
                    return Ok(());
                };
                let handle = session
                    .find_handle(&info_hash)
                    .ok_or_else(|| anyhow!("torrent {info_hash} left the session"))?;
                handle.request_resume_data()
            },
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
