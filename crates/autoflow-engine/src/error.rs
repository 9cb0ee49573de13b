//! Engine error types.
//!
//! Hard failures abort the whole call and surface here; business-level
//! "not yet" outcomes are not errors — they travel as
//! [`ExecutionOutcome::Skipped`](crate::executor::ExecutionOutcome).

use autoflow_core::{ActionKind, FlowId, TriggerKind, Unauthorized};
use autoflow_registry::RegistryError;
use autoflow_vault::VaultError;

/// Unified error type for the engine crate.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the flow registry or rate limiter.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An error propagated from the vault store.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    // -- Plugin registry -----------------------------------------------------
    /// No trigger plugin is registered for the flow's type tag.
    #[error("no trigger plugin registered for type {kind}")]
    TriggerNotRegistered { kind: TriggerKind },

    /// No action plugin is registered for an action's type tag.
    #[error("no action plugin registered for type {kind}")]
    ActionNotRegistered { kind: ActionKind },

    /// The trigger type tag already has a live plugin; unregister first.
    #[error("trigger type {kind} is already registered")]
    TriggerKindInUse { kind: TriggerKind },

    /// The action type tag already has a live plugin; unregister first.
    #[error("action type {kind} is already registered")]
    ActionKindInUse { kind: ActionKind },

    /// The caller is not the engine operator.
    #[error("not the engine operator: {0}")]
    NotOperator(#[from] Unauthorized),

    // -- Execution -----------------------------------------------------------
    /// The flow's condition payload could not be decoded.
    #[error("invalid condition payload: {reason}")]
    InvalidCondition { reason: String },

    /// The fee could not be collected after the action already succeeded.
    /// Distinct from action failure; see the partial-effect note in the
    /// executor docs.
    #[error("fee transfer failed: {reason}")]
    FeeTransferFailed { reason: String },

    /// An execution attempt re-entered a flow that is already mid-attempt.
    #[error("flow {flow_id} is already executing")]
    ReentrantExecution { flow_id: FlowId },

    // -- Configuration -------------------------------------------------------
    /// The engine configuration is invalid.
    #[error("invalid engine config: {reason}")]
    InvalidConfig { reason: String },

    /// Reading a configuration file failed.
    #[error("config io error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Parsing a configuration file failed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
