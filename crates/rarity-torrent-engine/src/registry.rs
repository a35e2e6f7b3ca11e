//! Outstanding waiters keyed by alert predicates.
//!
//! # Design
//! - Waiters live in registration order; an alert resolves the first live match only.
//! - Each waiter owns the sender half of a oneshot channel, so resolution consumes it and a
//!   second resolution cannot be expressed.
//! - Dispatch locates before it removes and sweep partitions before it resolves; the
//!   collection is never mutated while being iterated.
//! - A panicking predicate costs only its own waiter; later waiters and the sweep still run.

use std::fmt::{self, Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rarity_torrent_core::{Alert, TorrentError, TorrentResult};
use tokio::sync::oneshot;
use tracing::warn;

use crate::handlers::panic_message;

/// Predicate deciding whether an alert resolves a waiter.
pub type AlertPredicate = Box<dyn Fn(&Alert) -> bool + Send>;

/// Receiver half handed back to the caller that registered a waiter.
pub type WaiterReceiver = oneshot::Receiver<TorrentResult<Alert>>;

/// Registry-unique waiter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

impl Display for WaiterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "waiter-{}", self.0)
    }
}

struct Waiter {
    id: WaiterId,
    predicate: AlertPredicate,
    slot: oneshot::Sender<TorrentResult<Alert>>,
    created_at: Instant,
    expire_after: Duration,
}

impl Waiter {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.expire_after
    }
}

/// Handle returned by [`WaiterRegistry::register`].
#[derive(Debug)]
pub struct WaiterTicket {
    id: WaiterId,
    receiver: WaiterReceiver,
}

impl WaiterTicket {
    /// Identifier usable with [`WaiterRegistry::retract`].
    #[must_use]
    pub const fn id(&self) -> WaiterId {
        self.id
    }

    /// Consume the ticket, yielding the single-resolution receiver.
    #[must_use]
    pub fn into_receiver(self) -> WaiterReceiver {
        self.receiver
    }
}

/// Ordered collection of outstanding waiters.
#[derive(Default)]
pub struct WaiterRegistry {
    waiters: Vec<Waiter>,
    next_id: u64,
}

impl WaiterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a waiter that resolves with the first alert satisfying `predicate`, or with
    /// [`TorrentError::Timeout`] once more than `expire_after` has elapsed since `now`.
    pub fn register<P>(&mut self, predicate: P, expire_after: Duration, now: Instant) -> WaiterTicket
    where
        P: Fn(&Alert) -> bool + Send + 'static,
    {
        let id = WaiterId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let (slot, receiver) = oneshot::channel();
        self.waiters.push(Waiter {
            id,
            predicate: Box::new(predicate),
            slot,
            created_at: now,
            expire_after,
        });
        WaiterTicket { id, receiver }
    }

    /// Resolve the earliest-registered waiter whose predicate accepts `alert`.
    ///
    /// A predicate that panics evicts its waiter, which resolves with [`TorrentError::Engine`].
    pub fn dispatch(&mut self, alert: &Alert) -> Option<WaiterId> {
        let mut panicked = Vec::new();
        let mut matched = None;
        for (index, waiter) in self.waiters.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| (waiter.predicate)(alert))) {
                Ok(true) => {
                    matched = Some(index);
                    break;
                }
                Ok(false) => {}
                Err(payload) => panicked.push((index, panic_message(payload.as_ref()))),
            }
        }

        let resolved = matched.map(|index| self.waiters[index].id);
        // Indices ascend because the scan stops at the match; remove from the back.
        let doomed: Vec<usize> = panicked.iter().map(|(index, _)| *index).chain(matched).collect();
        for index in doomed.into_iter().rev() {
            let waiter = self.waiters.remove(index);
            if Some(index) == matched {
                // The caller may have dropped its future; the waiter is consumed either way.
                let _ = waiter.slot.send(Ok(alert.clone()));
                continue;
            }
            let detail = panicked
                .iter()
                .find_map(|(failed, detail)| (*failed == index).then_some(detail.as_str()))
                .unwrap_or_default();
            warn!(waiter = %waiter.id, detail = %detail, "waiter predicate panicked; evicted");
            let _ = waiter.slot.send(Err(TorrentError::Engine {
                operation: "waiter.predicate",
                info_hash: alert.info_hash(),
                source: format!("waiter predicate panicked: {detail}").into(),
            }));
        }
        resolved
    }

    /// Remove and time out every waiter older than its expiry window.
    pub fn sweep(&mut self, now: Instant) -> Vec<WaiterId> {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.waiters)
            .into_iter()
            .partition(|waiter| waiter.is_expired(now));
        self.waiters = live;

        expired
            .into_iter()
            .map(|waiter| {
                let _ = waiter.slot.send(Err(TorrentError::Timeout {
                    expire_after: waiter.expire_after,
                }));
                waiter.id
            })
            .collect()
    }

    /// Remove a waiter without resolving it. Its receiver observes a closed channel.
    pub fn retract(&mut self, id: WaiterId) -> bool {
        match self.waiters.iter().position(|waiter| waiter.id == id) {
            Some(index) => {
                drop(self.waiters.remove(index));
                true
            }
            None => false,
        }
    }

    /// Whether a waiter is still outstanding.
    #[must_use]
    pub fn contains(&self, id: WaiterId) -> bool {
        self.waiters.iter().any(|waiter| waiter.id == id)
    }

    /// Number of outstanding waiters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether no waiter is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rarity_torrent_core::{AlertEvent, InfoHash, TorrentStatusChange};
    use tokio::sync::oneshot::error::TryRecvError;

    fn paused(byte: u8) -> Alert {
        Alert::status_changed(InfoHash::new([byte; 20]), TorrentStatusChange::Paused)
    }

    fn for_hash(byte: u8) -> impl Fn(&Alert) -> bool + Send + 'static {
        let info_hash = InfoHash::new([byte; 20]);
        move |alert| alert.info_hash() == Some(info_hash)
    }

    #[test]
    fn one_alert_resolves_only_the_earliest_match() {
        let mut registry = WaiterRegistry::new();
        let now = Instant::now();
        let first = registry.register(for_hash(1), Duration::from_secs(10), now);
        let second = registry.register(for_hash(1), Duration::from_secs(10), now);

        assert_eq!(registry.dispatch(&paused(1)), Some(first.id()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(second.id()));

        let mut first_rx = first.into_receiver();
        let mut second_rx = second.into_receiver();
        assert!(matches!(first_rx.try_recv(), Ok(Ok(alert)) if alert.event == paused(1).event));
        assert!(matches!(second_rx.try_recv(), Err(TryRecvError::Empty)));

        assert_eq!(registry.dispatch(&paused(1)), Some(WaiterId(1)));
        assert!(registry.is_empty());
        assert!(second_rx.try_recv().is_ok());
    }

    #[test]
    fn unmatched_alerts_leave_waiters_in_place() {
        let mut registry = WaiterRegistry::new();
        let ticket = registry.register(for_hash(1), Duration::from_secs(10), Instant::now());
        assert_eq!(registry.dispatch(&paused(2)), None);
        assert!(registry.contains(ticket.id()));
    }

    #[test]
    fn sweep_times_out_only_expired_waiters() {
        let mut registry = WaiterRegistry::new();
        let start = Instant::now();
        let short = registry.register(for_hash(1), Duration::from_secs(5), start);
        let long = registry.register(for_hash(2), Duration::from_secs(60), start);

        assert!(registry.sweep(start + Duration::from_secs(5)).is_empty());
        let expired = registry.sweep(start + Duration::from_secs(6));
        assert_eq!(expired, vec![short.id()]);
        assert!(registry.contains(long.id()));

        let mut rx = short.into_receiver();
        match rx.try_recv() {
            Ok(Err(TorrentError::Timeout { expire_after })) => {
                assert_eq!(expire_after, Duration::from_secs(5));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn expired_waiter_cannot_be_matched_afterwards() {
        let mut registry = WaiterRegistry::new();
        let start = Instant::now();
        let ticket = registry.register(for_hash(1), Duration::from_secs(1), start);
        registry.sweep(start + Duration::from_secs(2));
        assert_eq!(registry.dispatch(&paused(1)), None);
        assert!(matches!(
            ticket.into_receiver().try_recv(),
            Ok(Err(TorrentError::Timeout { .. }))
        ));
    }

    #[test]
    fn retract_drops_the_slot_without_resolving() {
        let mut registry = WaiterRegistry::new();
        let ticket = registry.register(for_hash(1), Duration::from_secs(10), Instant::now());
        assert!(registry.retract(ticket.id()));
        assert!(!registry.retract(ticket.id()));
        assert!(registry.is_empty());
        assert!(matches!(
            ticket.into_receiver().try_recv(),
            Err(TryRecvError::Closed)
        ));
    }

    #[test]
    fn dropped_receivers_do_not_block_dispatch() {
        let mut registry = WaiterRegistry::new();
        let ticket = registry.register(for_hash(3), Duration::from_secs(10), Instant::now());
        let id = ticket.id();
        drop(ticket);
        assert_eq!(registry.dispatch(&paused(3)), Some(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn predicates_can_match_on_any_alert_shape() {
        let mut registry = WaiterRegistry::new();
        let ticket = registry.register(
            |alert: &Alert| matches!(alert.event, AlertEvent::Other { .. }),
            Duration::from_secs(10),
            Instant::now(),
        );
        let other = Alert::new(AlertEvent::Other {
            info_hash: None,
            message: "listen succeeded".to_string(),
        });
        assert_eq!(registry.dispatch(&paused(1)), None);
        assert_eq!(registry.dispatch(&other), Some(ticket.id()));
    }

    #[test]
    fn panicking_predicate_evicts_only_its_own_waiter() {
        let mut registry = WaiterRegistry::new();
        let now = Instant::now();
        let broken = registry.register(
            |_: &Alert| panic!("predicate exploded"),
            Duration::from_secs(10),
            now,
        );
        let healthy = registry.register(for_hash(4), Duration::from_secs(10), now);
        let bystander = registry.register(for_hash(9), Duration::from_secs(10), now);

        assert_eq!(registry.dispatch(&paused(4)), Some(healthy.id()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(bystander.id()));

        let mut broken_rx = broken.into_receiver();
        assert!(matches!(
            broken_rx.try_recv(),
            Ok(Err(TorrentError::Engine { operation: "waiter.predicate", .. }))
        ));
        let mut healthy_rx = healthy.into_receiver();
        assert!(matches!(healthy_rx.try_recv(), Ok(Ok(_))));
    }

    #[test]
    fn waiter_ids_render_with_prefix() {
        assert_eq!(WaiterId(4).to_string(), "waiter-4");
    }
}
