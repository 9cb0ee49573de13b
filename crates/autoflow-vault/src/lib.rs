//! Per-user custody vaults for Autoflow.
//!
//! A vault is one user's custody account: an owner identity, an emergency
//! pause switch, an approved-caller set, per-asset spending ceilings with
//! cumulative usage tracking, and per-asset balances.
//!
//! - **[`account`]** -- the single-vault state machine and its invariants.
//! - **[`store`]** -- the concurrent [`DashMap`]-backed collection exposing
//!   the public operation surface and publishing events.
//! - **[`error`]** -- unified vault error types via [`thiserror`].
//!
//! [`DashMap`]: dashmap::DashMap

pub mod account;
pub mod error;
pub mod store;

pub use account::{CapUsage, VaultAccount};
pub use error::{Result, VaultError};
pub use store::VaultStore;
