//! Trigger/action plugin registry.
//!
//! A keyed collection from numeric type tag to trait object.  Registration
//! and unregistration are the only mutators (operator-gated); lookups are
//! pure reads.  A tag with a live plugin cannot be silently overwritten —
//! it must be explicitly unregistered first, so a live type slot cannot be
//! hijacked.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use autoflow_core::{
    AccountId, Action, ActionKind, Clock, EventBus, FlowEvent, Trigger, TriggerKind,
    require_owner,
};

use crate::error::{EngineError, Result};

/// Concurrent plugin registry backed by [`DashMap`].
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct PluginRegistry {
    inner: Arc<PluginRegistryInner>,
}

struct PluginRegistryInner {
    triggers: DashMap<TriggerKind, Arc<dyn Trigger>>,
    actions: DashMap<ActionKind, Arc<dyn Action>>,
    operator: AccountId,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl PluginRegistry {
    pub fn new(operator: AccountId, bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(PluginRegistryInner {
                triggers: DashMap::new(),
                actions: DashMap::new(),
                operator,
                bus,
                clock,
            }),
        }
    }

    // -- Triggers ------------------------------------------------------------

    /// Bind a trigger plugin to a type tag.  Operator-only; the tag must be
    /// free.
    pub fn register_trigger(
        &self,
        caller: AccountId,
        kind: TriggerKind,
        plugin: Arc<dyn Trigger>,
    ) -> Result<()> {
        require_owner(caller, self.inner.operator)?;
        match self.inner.triggers.entry(kind) {
            Entry::Occupied(_) => Err(EngineError::TriggerKindInUse { kind }),
            Entry::Vacant(slot) => {
                slot.insert(plugin);
                tracing::info!(kind = %kind, "trigger plugin registered");
                self.inner.bus.publish(FlowEvent::TriggerRegistered {
                    kind,
                    timestamp: self.inner.clock.now(),
                });
                Ok(())
            }
        }
    }

    /// Unbind the trigger plugin for a type tag.  Operator-only.
    pub fn unregister_trigger(&self, caller: AccountId, kind: TriggerKind) -> Result<()> {
        require_owner(caller, self.inner.operator)?;
        if self.inner.triggers.remove(&kind).is_none() {
            return Err(EngineError::TriggerNotRegistered { kind });
        }
        tracing::info!(kind = %kind, "trigger plugin unregistered");
        self.inner.bus.publish(FlowEvent::TriggerUnregistered {
            kind,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn is_trigger_registered(&self, kind: TriggerKind) -> bool {
        self.inner.triggers.contains_key(&kind)
    }

    pub fn resolve_trigger(&self, kind: TriggerKind) -> Option<Arc<dyn Trigger>> {
        self.inner.triggers.get(&kind).map(|e| Arc::clone(e.value()))
    }

    // -- Actions -------------------------------------------------------------

    /// Bind an action plugin to a type tag.  Operator-only; the tag must be
    /// free.
    pub fn register_action(
        &self,
        caller: AccountId,
        kind: ActionKind,
        plugin: Arc<dyn Action>,
    ) -> Result<()> {
        require_owner(caller, self.inner.operator)?;
        match self.inner.actions.entry(kind) {
            Entry::Occupied(_) => Err(EngineError::ActionKindInUse { kind }),
            Entry::Vacant(slot) => {
                slot.insert(plugin);
                tracing::info!(kind = %kind, "action plugin registered");
                self.inner.bus.publish(FlowEvent::ActionRegistered {
                    kind,
                    timestamp: self.inner.clock.now(),
                });
                Ok(())
            }
        }
    }

    /// Unbind the action plugin for a type tag.  Operator-only.
    pub fn unregister_action(&self, caller: AccountId, kind: ActionKind) -> Result<()> {
        require_owner(caller, self.inner.operator)?;
        if self.inner.actions.remove(&kind).is_none() {
            return Err(EngineError::ActionNotRegistered { kind });
        }
        tracing::info!(kind = %kind, "action plugin unregistered");
        self.inner.bus.publish(FlowEvent::ActionUnregistered {
            kind,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn is_action_registered(&self, kind: ActionKind) -> bool {
        self.inner.actions.contains_key(&kind)
    }

    pub fn resolve_action(&self, kind: ActionKind) -> Option<Arc<dyn Action>> {
        self.inner.actions.get(&kind).map(|e| Arc::clone(e.value()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autoflow_core::{FlowId, PluginFault, SystemClock};
    use serde_json::Value;

    struct NeverMet;

    #[async_trait]
    impl Trigger for NeverMet {
        async fn is_met(&self, _flow_id: FlowId, _data: &Value) -> std::result::Result<bool, PluginFault> {
            Ok(false)
        }
    }

    struct Noop;

    #[async_trait]
    impl Action for Noop {
        async fn execute(
            &self,
            _vault: AccountId,
            _data: &Value,
        ) -> std::result::Result<(), PluginFault> {
            Ok(())
        }
    }

    fn operator() -> AccountId {
        AccountId::from_low_u64(10)
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new(operator(), EventBus::new(64), Arc::new(SystemClock))
    }

    #[test]
    fn register_resolve_unregister() {
        let registry = registry();
        registry
            .register_trigger(operator(), TriggerKind::SCHEDULE, Arc::new(NeverMet))
            .unwrap();

        assert!(registry.is_trigger_registered(TriggerKind::SCHEDULE));
        assert!(registry.resolve_trigger(TriggerKind::SCHEDULE).is_some());
        assert!(registry.resolve_trigger(TriggerKind::PRICE_THRESHOLD).is_none());

        registry
            .unregister_trigger(operator(), TriggerKind::SCHEDULE)
            .unwrap();
        assert!(!registry.is_trigger_registered(TriggerKind::SCHEDULE));
    }

    #[test]
    fn live_slot_cannot_be_overwritten() {
        let registry = registry();
        registry
            .register_action(operator(), ActionKind::TRANSFER, Arc::new(Noop))
            .unwrap();

        let err = registry
            .register_action(operator(), ActionKind::TRANSFER, Arc::new(Noop))
            .unwrap_err();
        assert!(matches!(err, EngineError::ActionKindInUse { .. }));

        // Explicit unregister frees the slot.
        registry
            .unregister_action(operator(), ActionKind::TRANSFER)
            .unwrap();
        registry
            .register_action(operator(), ActionKind::TRANSFER, Arc::new(Noop))
            .unwrap();
    }

    #[test]
    fn only_the_operator_mutates() {
        let registry = registry();
        let stranger = AccountId::from_low_u64(99);

        assert!(matches!(
            registry.register_trigger(stranger, TriggerKind::SCHEDULE, Arc::new(NeverMet)),
            Err(EngineError::NotOperator(_))
        ));
        assert!(matches!(
            registry.unregister_action(stranger, ActionKind::TRANSFER),
            Err(EngineError::NotOperator(_))
        ));
    }

    #[test]
    fn unregistering_a_free_slot_errors() {
        let registry = registry();
        assert!(matches!(
            registry.unregister_trigger(operator(), TriggerKind::SCHEDULE),
            Err(EngineError::TriggerNotRegistered { .. })
        ));
    }
}
