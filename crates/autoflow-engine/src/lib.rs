//! Flow execution orchestrator for Autoflow.
//!
//! - **[`executor`]** -- the [`FlowExecutor`]: one strictly-ordered,
//!   short-circuiting execution attempt per call, with well-defined
//!   soft/hard failure tiers and a read-only eligibility probe.
//! - **[`plugins`]** -- the operator-gated [`PluginRegistry`] mapping
//!   numeric type tags to trigger/action trait objects.
//! - **[`condition`]** -- minimum-balance condition decoding.
//! - **[`fees`]** -- the basis-point fee split and the [`FeeLedger`].
//! - **[`config`]** -- the TOML-loadable [`EngineConfig`].
//! - **[`error`]** -- unified engine error types via [`thiserror`].

pub mod condition;
pub mod config;
pub mod error;
pub mod executor;
pub mod fees;
pub mod plugins;

pub use condition::BalanceCondition;
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use executor::{EligibilityProbe, ExecutionOutcome, FlowExecutor, SkipReason};
pub use fees::{FeeLedger, FeeSplit, split_fee};
pub use plugins::PluginRegistry;
