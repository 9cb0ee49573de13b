//! Durable flow store with ownership-gated lifecycle transitions.
//!
//! Identifiers are allocated from an atomic counter and never reused.  The
//! owner index preserves creation order, so [`flows_by_owner`] returns ids
//! oldest first.  [`record_execution`] is the only path that advances a
//! flow's execution counter; it is meant to be called exclusively by the
//! orchestrator after a fully successful attempt.
//!
//! [`flows_by_owner`]: FlowRegistry::flows_by_owner
//! [`record_execution`]: FlowRegistry::record_execution

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use autoflow_core::{AccountId, Clock, EventBus, FlowEvent, FlowId, require_owner};

use crate::error::{RegistryError, Result};
use crate::flow::{Flow, FlowSpec};

/// Concurrent flow registry.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct FlowRegistry {
    inner: Arc<FlowRegistryInner>,
}

struct FlowRegistryInner {
    flows: DashMap<FlowId, Flow>,
    by_owner: DashMap<AccountId, Vec<FlowId>>,
    next_id: AtomicU64,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl FlowRegistry {
    pub fn new(bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(FlowRegistryInner {
                flows: DashMap::new(),
                by_owner: DashMap::new(),
                next_id: AtomicU64::new(1),
                bus,
                clock,
            }),
        }
    }

    /// Store a new flow owned by `owner` and return its identifier.
    ///
    /// Fails with [`RegistryError::InvalidTriggerType`] when the trigger
    /// tag is outside the supported range and with
    /// [`RegistryError::EmptyActions`] when the spec carries no actions.
    pub fn create_flow(&self, owner: AccountId, spec: FlowSpec) -> Result<FlowId> {
        if !spec.trigger_kind.is_supported() {
            return Err(RegistryError::InvalidTriggerType {
                kind: spec.trigger_kind,
            });
        }
        if spec.actions.is_empty() {
            return Err(RegistryError::EmptyActions);
        }

        let id = FlowId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let now = self.inner.clock.now();
        let trigger_kind = spec.trigger_kind;

        self.inner
            .flows
            .insert(id, Flow::from_spec(id, owner, spec, now));
        self.inner.by_owner.entry(owner).or_default().push(id);

        tracing::info!(flow_id = %id, owner = %owner, trigger_kind = %trigger_kind, "flow created");
        self.inner.bus.publish(FlowEvent::FlowCreated {
            flow_id: id,
            owner,
            trigger_kind,
            timestamp: now,
        });

        Ok(id)
    }

    /// Retrieve a snapshot of a flow.
    pub fn get_flow(&self, id: FlowId) -> Result<Flow> {
        self.inner
            .flows
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RegistryError::FlowNotFound { flow_id: id })
    }

    /// All flow ids ever created by `owner`, oldest first.  Never fails.
    pub fn flows_by_owner(&self, owner: AccountId) -> Vec<FlowId> {
        self.inner
            .by_owner
            .get(&owner)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Activate or deactivate a flow.  Owner-only.
    ///
    /// Deactivation blocks future successful executions but leaves the flow
    /// and its history retrievable indefinitely.
    pub fn update_flow_status(&self, caller: AccountId, id: FlowId, active: bool) -> Result<()> {
        let mut entry = self
            .inner
            .flows
            .get_mut(&id)
            .ok_or(RegistryError::FlowNotFound { flow_id: id })?;

        require_owner(caller, entry.owner)?;
        entry.active = active;

        tracing::info!(flow_id = %id, active, "flow status changed");
        self.inner.bus.publish(FlowEvent::FlowStatusChanged {
            flow_id: id,
            active,
            timestamp: self.inner.clock.now(),
        });

        Ok(())
    }

    /// Stamp a successful execution: set `last_executed_at` to the current
    /// time and increment `execution_count`.
    ///
    /// Only the orchestrator's success path may call this.
    pub fn record_execution(&self, id: FlowId) -> Result<()> {
        let mut entry = self
            .inner
            .flows
            .get_mut(&id)
            .ok_or(RegistryError::FlowNotFound { flow_id: id })?;

        if !entry.active {
            return Err(RegistryError::FlowInactive { flow_id: id });
        }

        let now = self.inner.clock.now();
        entry.last_executed_at = Some(now);
        entry.execution_count += 1;

        tracing::debug!(
            flow_id = %id,
            execution_count = entry.execution_count,
            "execution recorded"
        );

        Ok(())
    }

    /// Total number of flows ever created.
    pub fn flow_count(&self) -> usize {
        self.inner.flows.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
