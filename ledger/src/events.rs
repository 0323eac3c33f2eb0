//! # Transfer Notifications
//!
//! Every accepted transfer, vesting or not, produces a [`TransferEvent`]
//! handed to a [`TransferNotifier`]. Delivery is fire-and-forget: the ledger
//! logs a failed notification and keeps its state as committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::address::Address;

/// A value movement between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Debited account.
    pub from: Address,
    /// Credited account.
    pub to: Address,
    /// Amount moved.
    pub amount: u64,
    /// `true` when the transfer created a vesting lock on `to`.
    pub vesting: bool,
    /// Ledger time of the transfer.
    pub timestamp: DateTime<Utc>,
}

impl TransferEvent {
    /// Builds an event with a fresh id.
    pub fn new(from: Address, to: Address, amount: u64, vesting: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            amount,
            vesting,
            timestamp,
        }
    }
}

/// Failure reported by a notifier. Never propagated to ledger callers.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound channel for transfer notifications.
pub trait TransferNotifier: Send {
    /// Publishes `event`.
    fn notify_transfer(&self, event: &TransferEvent) -> Result<(), NotifyError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl TransferNotifier for NoopNotifier {
    fn notify_transfer(&self, _event: &TransferEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Records events in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<TransferEvent>>>,
}

impl MemoryNotifier {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn events(&self) -> Vec<TransferEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl TransferNotifier for MemoryNotifier {
    fn notify_transfer(&self, event: &TransferEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
