//! Single-resolution futures returned by correlated operations.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use rarity_torrent_core::{Alert, AlertEvent, TorrentError, TorrentResult};

use crate::error::{SessionError, op_failed};
use crate::registry::{WaiterReceiver, WaiterTicket};

/// Outcome of a mutating torrent operation.
///
/// Resolves with the confirming alert, or with the error that prevented confirmation.
/// An `OperationFailed` alert surfaces as [`TorrentError::Engine`]; a waiter removed without
/// resolution surfaces as [`TorrentError::Cancelled`].
#[must_use = "completions do nothing unless awaited"]
#[derive(Debug)]
pub struct Completion {
    operation: &'static str,
    state: CompletionState,
}

#[derive(Debug)]
enum CompletionState {
    Ready(Option<TorrentResult<Alert>>),
    Waiting(WaiterReceiver),
}

impl Completion {
    /// A completion that has already failed.
    pub const fn failed(operation: &'static str, error: TorrentError) -> Self {
        Self {
            operation,
            state: CompletionState::Ready(Some(Err(error))),
        }
    }

    pub(crate) fn waiting(operation: &'static str, ticket: WaiterTicket) -> Self {
        Self {
            operation,
            state: CompletionState::Waiting(ticket.into_receiver()),
        }
    }

    /// Operation identifier this completion belongs to.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Whether the outcome was decided without registering a waiter.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, CompletionState::Ready(_))
    }
}

impl Future for Completion {
    type Output = TorrentResult<Alert>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let operation = this.operation;
        match &mut this.state {
            CompletionState::Ready(outcome) => Poll::Ready(
                outcome
                    .take()
                    .unwrap_or(Err(TorrentError::Cancelled { operation })),
            ),
            CompletionState::Waiting(receiver) => {
                Pin::new(receiver).poll(cx).map(|received| match received {
                    Ok(Ok(alert)) => confirm(operation, alert),
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(TorrentError::Cancelled { operation }),
                })
            }
        }
    }
}

fn confirm(operation: &'static str, alert: Alert) -> TorrentResult<Alert> {
    match alert.event {
        AlertEvent::OperationFailed {
            info_hash, message, ..
        } => Err(op_failed(
            operation,
            Some(info_hash),
            SessionError::AlertFailure { message },
        )),
        _ => Ok(alert),
    }
}
