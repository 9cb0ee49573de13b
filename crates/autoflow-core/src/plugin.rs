//! Plugin capability traits.
//!
//! Triggers and actions are untrusted collaborators resolved by numeric
//! type tag at execution time.  Both report failure through the structured
//! [`PluginFault`]; the orchestrator additionally catches panics at the
//! call boundary and normalizes them to a generic reason, so a misbehaving
//! plugin can never corrupt the engine's own bookkeeping.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{AccountId, DomainId, FlowId};

/// Structured failure reported by a plugin.
///
/// The reason string is surfaced verbatim in the execution outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct PluginFault {
    pub reason: String,
}

impl PluginFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Predicate deciding whether a flow's preconditions are currently met.
///
/// `trigger_data` is the opaque payload stored with the flow; each
/// implementation defines its own schema.
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn is_met(&self, flow_id: FlowId, trigger_data: &Value) -> Result<bool, PluginFault>;
}

/// Effect performed against a vault once a flow fires.
///
/// Implementations must go through the vault's approved-caller surface for
/// anything that spends; the engine treats any returned fault as a soft
/// failure of the attempt.
#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(&self, vault: AccountId, action_data: &Value) -> Result<(), PluginFault>;
}

/// Cross-domain message transport consumed by relay actions.
#[async_trait]
pub trait DomainMessenger: Send + Sync {
    async fn send(&self, domain: DomainId, payload: Vec<u8>) -> Result<(), PluginFault>;
}
