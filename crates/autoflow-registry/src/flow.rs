//! Flow definitions.
//!
//! A [`Flow`] is a stored (trigger, optional condition, action-list) tuple
//! owned by one vault, plus lifecycle and execution-count state.  The
//! trigger, condition, and action payloads are opaque JSON interpreted by
//! the plugin registered for the corresponding type tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use autoflow_core::{AccountId, ActionKind, Amount, DomainId, FlowId, TriggerKind};

/// One action entry: a plugin type tag and its opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub data: Value,
}

impl ActionSpec {
    pub fn new(kind: ActionKind, data: Value) -> Self {
        Self { kind, data }
    }
}

/// The caller-supplied description of a flow to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    /// Trigger plugin type tag.
    pub trigger_kind: TriggerKind,
    /// Trigger-specific numeric parameter (thresholds, schedules encode
    /// their own meaning).
    #[serde(default)]
    pub trigger_value: Amount,
    /// Opaque trigger payload.
    pub trigger_data: Value,
    /// Optional opaque condition payload; `None` means "no condition".
    #[serde(default)]
    pub condition_data: Option<Value>,
    /// One or more actions, executed in order.
    pub actions: Vec<ActionSpec>,
    /// Destination domain for cross-domain flows; the executor appends a
    /// relay action automatically when set.
    #[serde(default)]
    pub destination_domain: Option<DomainId>,
}

impl FlowSpec {
    /// Start a spec with the given trigger; add actions with
    /// [`with_action`].
    ///
    /// [`with_action`]: FlowSpec::with_action
    pub fn new(trigger_kind: TriggerKind, trigger_data: Value) -> Self {
        Self {
            trigger_kind,
            trigger_value: 0,
            trigger_data,
            condition_data: None,
            actions: Vec::new(),
            destination_domain: None,
        }
    }

    pub fn with_trigger_value(mut self, value: Amount) -> Self {
        self.trigger_value = value;
        self
    }

    pub fn with_condition(mut self, condition_data: Value) -> Self {
        self.condition_data = Some(condition_data);
        self
    }

    pub fn with_action(mut self, kind: ActionKind, data: Value) -> Self {
        self.actions.push(ActionSpec::new(kind, data));
        self
    }

    pub fn with_destination_domain(mut self, domain: DomainId) -> Self {
        self.destination_domain = Some(domain);
        self
    }
}

/// A stored flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique, monotonically assigned, never reused.
    pub id: FlowId,
    /// The vault that created the flow.  Immutable.
    pub owner: AccountId,
    pub trigger_kind: TriggerKind,
    pub trigger_value: Amount,
    pub trigger_data: Value,
    pub condition_data: Option<Value>,
    pub actions: Vec<ActionSpec>,
    pub destination_domain: Option<DomainId>,
    /// Mutable only by the owner; `false` blocks future executions but
    /// never rewrites history.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Written only by the orchestrator's success path.
    pub last_executed_at: Option<DateTime<Utc>>,
    /// Monotonically non-decreasing; incremented only on full success.
    pub execution_count: u64,
}

impl Flow {
    pub(crate) fn from_spec(
        id: FlowId,
        owner: AccountId,
        spec: FlowSpec,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            trigger_kind: spec.trigger_kind,
            trigger_value: spec.trigger_value,
            trigger_data: spec.trigger_data,
            condition_data: spec.condition_data,
            actions: spec.actions,
            destination_domain: spec.destination_domain,
            active: true,
            created_at,
            last_executed_at: None,
            execution_count: 0,
        }
    }
}
