//! Periodic alert pump.
//!
//! # Design
//! - Each tick drains every alert currently queued, runs handlers then waiters for each in
//!   arrival order, and sweeps expired waiters last, so a queued match always beats expiry.
//! - The whole tick runs under the dispatch lock.
//! - A panicking tick is caught and marks the session degraded; the loop keeps running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rarity_torrent_core::EngineSession;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::dispatch::AlertDispatcher;
use crate::handlers::{COMPONENT_SESSION, panic_message};

/// Tick period used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Counters describing one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Alerts drained.
    pub alerts: usize,
    /// Waiters resolved by a matching alert.
    pub resolved: usize,
    /// Waiters timed out by the sweep.
    pub expired: usize,
    /// Handler invocations that failed.
    pub handler_failures: usize,
}

/// Drives alert dispatch on a fixed schedule.
pub struct AlertPump {
    session: Arc<dyn EngineSession>,
    dispatcher: AlertDispatcher,
    interval: Duration,
}

impl AlertPump {
    /// Create a pump with the default interval.
    #[must_use]
    pub fn new(session: Arc<dyn EngineSession>, dispatcher: AlertDispatcher) -> Self {
        Self {
            session,
            dispatcher,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the tick period.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one tick against the clock reading `now`.
    pub fn tick(&self, now: Instant) -> TickSummary {
        let mut state = self.dispatcher.lock();
        let mut summary = TickSummary::default();

        while let Some(alert) = self.session.pop_alert() {
            summary.alerts += 1;
            debug!(
                kind = %alert.kind(),
                info_hash = ?alert.info_hash(),
                message = %alert.message(),
                "processing engine alert"
            );
            let outcome = self.dispatcher.process(&mut state, &alert);
            summary.handler_failures += outcome.handler_failures;
            if let Some(waiter) = outcome.resolved {
                summary.resolved += 1;
                debug!(waiter = %waiter, kind = %alert.kind(), "waiter resolved");
            }
        }

        let expired = self.dispatcher.sweep(&mut state, now);
        for waiter in &expired {
            warn!(waiter = %waiter, "waiter expired without a matching alert");
        }
        summary.expired = expired.len();
        self.dispatcher.publish_pending(&state);
        if let Some(metrics) = self.dispatcher.metrics() {
            metrics.set_active_torrents(self.session.list_handles().len());
        }
        summary
    }

    /// Run one tick, converting a panic into a degraded session.
    pub fn run_tick(&self, now: Instant) -> Option<TickSummary> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.tick(now))) {
            Ok(summary) => Some(summary),
            Err(payload) => {
                let detail = format!("alert pump panicked: {}", panic_message(payload.as_ref()));
                self.dispatcher
                    .health()
                    .mark_degraded(COMPONENT_SESSION, Some(&detail));
                None
            }
        }
    }

    /// Spawn the pump loop; it stops once `shutdown` flips to `true` or its sender drops.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?self.interval, "alert pump started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_tick(Instant::now());
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            self.run_tick(Instant::now());
            info!("alert pump stopped");
        })
    }
}
