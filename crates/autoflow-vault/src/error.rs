//! Vault error types.
//!
//! All vault operations surface errors through [`VaultError`].  Variants
//! fall into three tiers: structural (unknown vault, invalid account),
//! authorization (not owner, caller not approved), and business (paused,
//! cap exceeded, insufficient balance).

use autoflow_core::{AccountId, Amount, AssetId, Unauthorized};

/// Unified error type for the vault crate.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // -- Structural ----------------------------------------------------------
    /// No vault exists for the given account.
    #[error("vault not found: {vault}")]
    VaultNotFound { vault: AccountId },

    /// A vault already exists for the given account.
    #[error("vault already exists: {vault}")]
    VaultAlreadyExists { vault: AccountId },

    /// The null account was supplied where a real account is required.
    #[error("invalid account: the null account is not allowed here")]
    InvalidAccount,

    // -- Authorization -------------------------------------------------------
    /// The caller is not the vault owner.
    #[error("not the vault owner: {0}")]
    NotOwner(#[from] Unauthorized),

    /// The caller is not in the vault's approved-caller set.
    #[error("caller {caller} is not approved on vault {vault}")]
    CallerNotApproved { vault: AccountId, caller: AccountId },

    // -- Business ------------------------------------------------------------
    /// The vault's emergency pause switch is engaged.
    #[error("vault {vault} is paused")]
    VaultPaused { vault: AccountId },

    /// Recording the spend would push cumulative usage past the ceiling.
    #[error("spending cap exceeded for asset {asset}: requested {requested}, remaining {remaining}")]
    SpendingCapExceeded {
        asset: AssetId,
        requested: Amount,
        remaining: Amount,
    },

    /// The vault balance cannot cover the debit.
    #[error("insufficient balance for asset {asset}: requested {requested}, available {balance}")]
    InsufficientBalance {
        asset: AssetId,
        requested: Amount,
        balance: Amount,
    },
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;
