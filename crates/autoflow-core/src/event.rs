//! Flow event bus.
//!
//! Every state-changing path in the workspace publishes a [`FlowEvent`] to
//! a shared [`EventBus`] built on [`tokio::sync::broadcast`].  Events are
//! wrapped in [`Arc`] so that fanning out to multiple subscribers does not
//! clone the payload.
//!
//! Publishing with no active subscribers is not an error — components emit
//! unconditionally and observers attach when they care.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{AccountId, ActionKind, Amount, AssetId, FlowId, TriggerKind};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An observable side effect of a state-changing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowEvent {
    /// A new flow was stored in the registry.
    FlowCreated {
        flow_id: FlowId,
        owner: AccountId,
        trigger_kind: TriggerKind,
        timestamp: DateTime<Utc>,
    },

    /// A flow was activated or deactivated by its owner.
    FlowStatusChanged {
        flow_id: FlowId,
        active: bool,
        timestamp: DateTime<Utc>,
    },

    /// An execution attempt completed (successfully or as a soft failure).
    ExecutionAttempted {
        attempt_id: Uuid,
        flow_id: FlowId,
        executor: AccountId,
        success: bool,
        /// Populated on soft failures with the business reason.
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A per-asset spending ceiling was (re)configured on a vault.
    SpendingCapSet {
        vault: AccountId,
        asset: AssetId,
        cap: Amount,
        timestamp: DateTime<Utc>,
    },

    /// Spending was recorded against a vault's cap.
    SpendingRecorded {
        vault: AccountId,
        asset: AssetId,
        amount: Amount,
        remaining: Amount,
        timestamp: DateTime<Utc>,
    },

    /// A caller was added to a vault's approved set.
    CallerApproved {
        vault: AccountId,
        caller: AccountId,
        timestamp: DateTime<Utc>,
    },

    /// A caller was removed from a vault's approved set.
    CallerRevoked {
        vault: AccountId,
        caller: AccountId,
        timestamp: DateTime<Utc>,
    },

    /// A vault's emergency pause switch was engaged.
    VaultPaused {
        vault: AccountId,
        timestamp: DateTime<Utc>,
    },

    /// A vault's emergency pause switch was released.
    VaultUnpaused {
        vault: AccountId,
        timestamp: DateTime<Utc>,
    },

    /// A trigger plugin was bound to a type tag.
    TriggerRegistered {
        kind: TriggerKind,
        timestamp: DateTime<Utc>,
    },

    /// A trigger plugin was unbound from a type tag.
    TriggerUnregistered {
        kind: TriggerKind,
        timestamp: DateTime<Utc>,
    },

    /// An action plugin was bound to a type tag.
    ActionRegistered {
        kind: ActionKind,
        timestamp: DateTime<Utc>,
    },

    /// An action plugin was unbound from a type tag.
    ActionUnregistered {
        kind: ActionKind,
        timestamp: DateTime<Utc>,
    },

    /// An execution-cadence limit was configured for an account.
    RateLimitConfigured {
        account: AccountId,
        limit_per_day: u32,
        timestamp: DateTime<Utc>,
    },

    /// An execution attempt was throttled by the rate limiter.
    RateLimitExceeded {
        account: AccountId,
        flow_id: FlowId,
        timestamp: DateTime<Utc>,
    },

    /// A collected fee was split between the treasury and the executor.
    FeeDistributed {
        flow_id: FlowId,
        executor: AccountId,
        executor_amount: Amount,
        protocol_amount: Amount,
        timestamp: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

/// Publish/subscribe bus for [`FlowEvent`]s.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.  Subscribers receive
/// [`Arc<FlowEvent>`] references.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    sender: broadcast::Sender<Arc<FlowEvent>>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    ///
    /// A subscriber that falls behind by more than `capacity` events
    /// observes a `Lagged` error telling it how many events it missed.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(EventBusInner { sender }),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that will observe the event; zero
    /// when nobody is listening.
    pub fn publish(&self, event: FlowEvent) -> usize {
        match self.inner.sender.send(Arc::new(event)) {
            Ok(n) => {
                tracing::trace!(receivers = n, "flow event published");
                n
            }
            Err(_) => {
                tracing::trace!("flow event published with no active receivers");
                0
            }
        }
    }

    /// Create a subscriber that receives all future events.  Events
    /// published before this call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FlowEvent>> {
        self.inner.sender.subscribe()
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
