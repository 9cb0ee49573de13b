//! Shared vocabulary for the Autoflow workspace.
//!
//! This crate defines everything the subsystem crates agree on:
//!
//! - **[`types`]** -- account/asset/flow/domain identifiers, amounts, and
//!   the numeric trigger/action type tags.
//! - **[`auth`]** -- the single owner-authorization predicate behind every
//!   owner-gated mutation.
//! - **[`clock`]** -- the [`Clock`] capability (`SystemClock` in
//!   production, `ManualClock` for warped-time tests).
//! - **[`event`]** -- the [`FlowEvent`] vocabulary and the broadcast-backed
//!   [`EventBus`] every state-changing path publishes to.
//! - **[`plugin`]** -- the [`Trigger`] / [`Action`] / [`DomainMessenger`]
//!   capability traits and the structured [`PluginFault`].
//!
//! All public types are `Send + Sync` and designed for use within a
//! multi-threaded tokio runtime.

pub mod auth;
pub mod clock;
pub mod event;
pub mod plugin;
pub mod types;

// Re-export the most commonly used types at the crate root for convenience.
pub use auth::{Unauthorized, require_owner};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{EventBus, FlowEvent};
pub use plugin::{Action, DomainMessenger, PluginFault, Trigger};
pub use types::{
    AccountId, ActionKind, Amount, AssetId, BPS_DENOMINATOR, DomainId, FlowId, ParseIdError,
    TriggerKind,
};
