//! Shared dispatch state: the waiter registry and the standing handler table behind one lock.
//!
//! # Design
//! - A single `Mutex` guards both collections. The pump holds it for a whole tick and the
//!   correlator holds it across "register waiter, call engine, retract on failure", so a
//!   confirming alert can never be processed before its waiter exists.
//! - Lock order is always dispatch state first, engine session second.
//! - Poisoned locks are recovered so one panicking tick cannot wedge the process.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::Result;
use rarity_telemetry::Metrics;
use rarity_torrent_core::{Alert, EngineSession, ResumeStateStore};

use crate::handlers::StaticHandlerTable;
use crate::health::EngineHealth;
use crate::registry::{WaiterId, WaiterRegistry};

/// Collections guarded by the dispatch lock.
#[derive(Default)]
pub struct DispatchState {
    /// Outstanding waiters.
    pub registry: WaiterRegistry,
    /// Standing handlers.
    pub handlers: StaticHandlerTable,
}

/// What processing one alert did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertOutcome {
    /// Waiter resolved by the alert, if any.
    pub resolved: Option<WaiterId>,
    /// Handlers that failed on the alert.
    pub handler_failures: usize,
}

/// Cloneable access to the dispatch state plus the health and metrics it reports into.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    state: Arc<Mutex<DispatchState>>,
    health: EngineHealth,
    metrics: Option<Metrics>,
}

impl AlertDispatcher {
    /// Create a dispatcher with no waiters, no handlers, and no metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher that reports into `metrics`.
    #[must_use]
    pub fn with_metrics(metrics: Metrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::default()
        }
    }

    /// Acquire the dispatch lock.
    pub fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Health tracker fed by handler and pump failures.
    #[must_use]
    pub const fn health(&self) -> &EngineHealth {
        &self.health
    }

    /// Metrics registry, when configured.
    #[must_use]
    pub const fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Register a standing handler.
    pub fn register_handler<F, A>(
        &self,
        name: &'static str,
        component: &'static str,
        filter: F,
        action: A,
    ) where
        F: Fn(&Alert) -> bool + Send + 'static,
        A: Fn(&Alert) -> Result<()> + Send + 'static,
    {
        self.lock().handlers.register(name, component, filter, action);
    }

    /// Register the resume-data handlers every daemon runs.
    pub fn install_standing_handlers(
        &self,
        session: Arc<dyn EngineSession>,
        store: Arc<dyn ResumeStateStore>,
    ) {
        self.lock().handlers.install_standing_handlers(session, store);
    }

    /// Number of outstanding waiters.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.lock().registry.len()
    }

    /// Run handlers, then waiters, against one alert.
    pub fn process(&self, state: &mut DispatchState, alert: &Alert) -> AlertOutcome {
        let report = state.handlers.dispatch(alert);
        for component in &report.succeeded {
            self.health.mark_recovered(component);
        }
        for failure in &report.failures {
            self.health
                .mark_degraded(failure.component, Some(&failure.detail));
            if let Some(metrics) = &self.metrics {
                metrics.inc_handler_failure(failure.handler);
            }
        }

        let resolved = state.registry.dispatch(alert);
        if let Some(metrics) = &self.metrics {
            metrics.inc_alert(alert.kind().as_str());
            if resolved.is_some() {
                metrics.inc_waiter_resolved("matched");
            }
        }
        AlertOutcome {
            resolved,
            handler_failures: report.failures.len(),
        }
    }

    /// Time out expired waiters.
    pub fn sweep(&self, state: &mut DispatchState, now: Instant) -> Vec<WaiterId> {
        let expired = state.registry.sweep(now);
        if let Some(metrics) = &self.metrics {
            for _ in &expired {
                metrics.inc_waiter_resolved("expired");
            }
        }
        expired
    }

    /// Withdraw a waiter whose engine call failed.
    pub fn retract(&self, state: &mut DispatchState, id: WaiterId) -> bool {
        let retracted = state.registry.retract(id);
        if retracted && let Some(metrics) = &self.metrics {
            metrics.inc_waiter_resolved("retracted");
        }
        retracted
    }

    /// Publish the pending-waiter gauge.
    pub fn publish_pending(&self, state: &DispatchState) {
        if let Some(metrics) = &self.metrics {
            metrics.set_waiters_pending(state.registry.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use rarity_torrent_core::{InfoHash, TorrentStatusChange};
    use std::time::Duration;

    fn paused() -> Alert {
        Alert::status_changed(InfoHash::new([1; 20]), TorrentStatusChange::Paused)
    }

    #[test]
    fn handlers_run_even_when_a_waiter_matches() -> Result<()> {
        let metrics = Metrics::new()?;
        let dispatcher = AlertDispatcher::with_metrics(metrics.clone());
        dispatcher.register_handler("always_fails", "resume_store", |_| true, |_| {
            Err(anyhow!("disk full"))
        });

        let mut state = dispatcher.lock();
        let ticket = state
            .registry
            .register(|_| true, Duration::from_secs(5), Instant::now());
        let outcome = dispatcher.process(&mut state, &paused());
        dispatcher.publish_pending(&state);
        drop(state);

        assert_eq!(outcome.resolved, Some(ticket.id()));
        assert_eq!(outcome.handler_failures, 1);
        assert_eq!(dispatcher.health().degraded(), vec!["resume_store"]);
        assert_eq!(metrics.snapshot().waiters_matched_total, 1);
        assert_eq!(metrics.snapshot().waiters_pending, 0);
        Ok(())
    }

    #[test]
    fn successful_handler_clears_degraded_component() {
        let dispatcher = AlertDispatcher::new();
        dispatcher.health().mark_degraded("session", Some("earlier failure"));
        dispatcher.register_handler("ok", "session", |_| true, |_| Ok(()));

        let mut state = dispatcher.lock();
        dispatcher.process(&mut state, &paused());
        drop(state);
        assert!(dispatcher.health().is_healthy());
    }

    #[test]
    fn sweep_and_retract_are_counted() -> Result<()> {
        let metrics = Metrics::new()?;
        let dispatcher = AlertDispatcher::with_metrics(metrics.clone());
        let start = Instant::now();

        let mut state = dispatcher.lock();
        let stale = state
            .registry
            .register(|_| false, Duration::from_secs(1), start);
        let withdrawn = state
            .registry
            .register(|_| false, Duration::from_secs(60), start);
        assert!(dispatcher.retract(&mut state, withdrawn.id()));
        assert!(!dispatcher.retract(&mut state, withdrawn.id()));
        let expired = dispatcher.sweep(&mut state, start + Duration::from_secs(2));
        drop(state);

        assert_eq!(expired, vec![stale.id()]);
        assert_eq!(dispatcher.pending_waiters(), 0);
        assert_eq!(metrics.snapshot().waiters_expired_total, 1);
        Ok(())
    }
}
