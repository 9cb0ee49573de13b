//! Registry and rate-limiter error types.

use autoflow_core::{FlowId, TriggerKind, Unauthorized};

/// Unified error type for the registry crate.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    // -- Flow registry -------------------------------------------------------
    /// No flow with this identifier was ever created.
    #[error("flow not found: {flow_id}")]
    FlowNotFound { flow_id: FlowId },

    /// The flow exists but has been deactivated by its owner.
    #[error("flow {flow_id} is inactive")]
    FlowInactive { flow_id: FlowId },

    /// The caller is not the flow's recorded owner.
    #[error("not the flow owner: {0}")]
    NotFlowOwner(#[from] Unauthorized),

    /// The trigger type tag is outside the supported range.
    #[error("invalid trigger type: {kind}")]
    InvalidTriggerType { kind: TriggerKind },

    /// A flow needs at least one action.
    #[error("a flow requires at least one action")]
    EmptyActions,

    // -- Rate limiter --------------------------------------------------------
    /// The null account was supplied where a real account is required.
    #[error("invalid account: the null account is not allowed here")]
    InvalidAccount,

    /// A daily limit of zero is meaningless.
    #[error("invalid limit: the daily limit must be at least 1")]
    InvalidLimit,
}

/// Convenience alias used throughout the registry crate.
pub type Result<T> = std::result::Result<T, RegistryError>;
