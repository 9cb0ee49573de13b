//! Single-vault state machine.
//!
//! A [`VaultAccount`] tracks four things for one user: the owner identity,
//! the emergency pause switch, the approved-caller set, and per-asset
//! accounting.  Accounting is two independent layers:
//!
//! - **Spending caps** (`cap` / `spent` per asset): a usage ceiling written
//!   by approved callers through [`record_spending`].  Setting a new cap
//!   resets usage to zero — the ceiling and its usage window are versioned
//!   together.
//! - **Balances** (per asset): what the vault actually holds.  Condition
//!   checks read balances directly; transfers and fee collection debit them.
//!
//! Invariant: after every successful operation, `spent <= cap` holds for
//! every asset.
//!
//! [`record_spending`]: VaultAccount::record_spending

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autoflow_core::{AccountId, Amount, AssetId, require_owner};

use crate::error::{Result, VaultError};

/// Per-asset spending ceiling and cumulative usage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapUsage {
    pub cap: Amount,
    pub spent: Amount,
}

/// Custody state for one user.
#[derive(Debug, Clone)]
pub struct VaultAccount {
    owner: AccountId,
    paused: bool,
    approved_callers: HashSet<AccountId>,
    caps: HashMap<AssetId, CapUsage>,
    balances: HashMap<AssetId, Amount>,
    created_at: DateTime<Utc>,
}

impl VaultAccount {
    pub fn new(owner: AccountId, created_at: DateTime<Utc>) -> Self {
        Self {
            owner,
            paused: false,
            approved_callers: HashSet::new(),
            caps: HashMap::new(),
            balances: HashMap::new(),
            created_at,
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // -- Spending caps -------------------------------------------------------

    /// Set the spending ceiling for an asset and reset its usage to zero.
    ///
    /// Owner-only.
    pub fn set_spending_cap(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        cap: Amount,
    ) -> Result<()> {
        require_owner(caller, self.owner)?;
        self.caps.insert(asset, CapUsage { cap, spent: 0 });
        Ok(())
    }

    /// The configured ceiling for an asset; zero when none was ever set.
    pub fn spending_cap(&self, asset: AssetId) -> Amount {
        self.caps.get(&asset).map(|u| u.cap).unwrap_or(0)
    }

    /// Cumulative usage recorded against the current ceiling.
    pub fn spent_amount(&self, asset: AssetId) -> Amount {
        self.caps.get(&asset).map(|u| u.spent).unwrap_or(0)
    }

    /// `max(0, cap - spent)`.  Never fails.
    pub fn remaining_cap(&self, asset: AssetId) -> Amount {
        self.caps
            .get(&asset)
            .map(|u| u.cap.saturating_sub(u.spent))
            .unwrap_or(0)
    }

    /// Record spending against the asset's ceiling.
    ///
    /// The caller must be in the approved set and the vault must not be
    /// paused.  An asset with no configured cap has a ceiling of zero, so
    /// any spend against it is rejected.  Returns the remaining headroom
    /// after the spend.
    pub fn record_spending(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<Amount> {
        self.require_approved(caller)?;
        self.require_unpaused()?;

        let usage = self.caps.entry(asset).or_default();
        let remaining = usage.cap.saturating_sub(usage.spent);
        match usage.spent.checked_add(amount) {
            Some(new_spent) if new_spent <= usage.cap => {
                usage.spent = new_spent;
                Ok(usage.cap - new_spent)
            }
            _ => Err(VaultError::SpendingCapExceeded {
                asset,
                requested: amount,
                remaining,
            }),
        }
    }

    /// Zero the usage tracker for an asset without touching its ceiling.
    ///
    /// Owner-only escape hatch for externally scheduled epoch resets.  An
    /// asset with no configured cap is left untouched.
    pub fn reset_usage_tracker(&mut self, caller: AccountId, asset: AssetId) -> Result<()> {
        require_owner(caller, self.owner)?;
        if let Some(usage) = self.caps.get_mut(&asset) {
            usage.spent = 0;
        }
        Ok(())
    }

    // -- Approved callers ----------------------------------------------------

    /// Add a caller to the approved set.  Owner-only, idempotent.
    pub fn approve_caller(&mut self, caller: AccountId, addr: AccountId) -> Result<()> {
        require_owner(caller, self.owner)?;
        if addr.is_zero() {
            return Err(VaultError::InvalidAccount);
        }
        self.approved_callers.insert(addr);
        Ok(())
    }

    /// Remove a caller from the approved set.  Owner-only, idempotent.
    pub fn revoke_caller(&mut self, caller: AccountId, addr: AccountId) -> Result<()> {
        require_owner(caller, self.owner)?;
        self.approved_callers.remove(&addr);
        Ok(())
    }

    pub fn is_approved_caller(&self, addr: AccountId) -> bool {
        self.approved_callers.contains(&addr)
    }

    // -- Pause switch --------------------------------------------------------

    /// Engage the pause switch, blocking subsequent spend-affecting calls.
    /// Owner-only.
    pub fn pause(&mut self, caller: AccountId) -> Result<()> {
        require_owner(caller, self.owner)?;
        self.paused = true;
        Ok(())
    }

    /// Release the pause switch.  Owner-only.
    pub fn unpause(&mut self, caller: AccountId) -> Result<()> {
        require_owner(caller, self.owner)?;
        self.paused = false;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -- Balances ------------------------------------------------------------

    /// Credit the vault balance.  Permissionless.
    pub fn deposit(&mut self, asset: AssetId, amount: Amount) {
        let balance = self.balances.entry(asset).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Debit the vault balance.  Approved-caller-only and pause-gated.
    pub fn debit(&mut self, caller: AccountId, asset: AssetId, amount: Amount) -> Result<()> {
        self.require_approved(caller)?;
        self.require_unpaused()?;

        let balance = self.balances.entry(asset).or_insert(0);
        if *balance < amount {
            return Err(VaultError::InsufficientBalance {
                asset,
                requested: amount,
                balance: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    pub fn balance_of(&self, asset: AssetId) -> Amount {
        self.balances.get(&asset).copied().unwrap_or(0)
    }

    // -- Internals -----------------------------------------------------------

    fn require_approved(&self, caller: AccountId) -> Result<()> {
        if self.approved_callers.contains(&caller) {
            Ok(())
        } else {
            Err(VaultError::CallerNotApproved {
                vault: self.owner,
                caller,
            })
        }
    }

    fn require_unpaused(&self) -> Result<()> {
        if self.paused {
            Err(VaultError::VaultPaused { vault: self.owner })
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> AccountId {
        AccountId::from_low_u64(1)
    }

    fn spender() -> AccountId {
        AccountId::from_low_u64(2)
    }

    fn vault() -> VaultAccount {
        let mut v = VaultAccount::new(owner(), Utc::now());
        v.approve_caller(owner(), spender()).unwrap();
        v
    }

    #[test]
    fn cap_then_spend_then_exceed() {
        let mut v = vault();
        let asset = AssetId::NATIVE;
        v.set_spending_cap(owner(), asset, 100).unwrap();

        let remaining = v.record_spending(spender(), asset, 60).unwrap();
        assert_eq!(remaining, 40);
        assert_eq!(v.remaining_cap(asset), 40);

        let err = v.record_spending(spender(), asset, 50).unwrap_err();
        assert!(matches!(err, VaultError::SpendingCapExceeded { .. }));
        assert_eq!(v.remaining_cap(asset), 40);
    }

    #[test]
    fn setting_cap_resets_usage() {
        let mut v = vault();
        let asset = AssetId::from_low_u64(9);
        v.set_spending_cap(owner(), asset, 100).unwrap();
        v.record_spending(spender(), asset, 80).unwrap();

        v.set_spending_cap(owner(), asset, 50).unwrap();
        assert_eq!(v.remaining_cap(asset), 50);
        assert_eq!(v.spent_amount(asset), 0);
    }

    #[test]
    fn spent_never_exceeds_cap() {
        let mut v = vault();
        let asset = AssetId::NATIVE;
        v.set_spending_cap(owner(), asset, 10).unwrap();

        for amount in [4, 4, 4, 4] {
            let _ = v.record_spending(spender(), asset, amount);
            assert!(v.spent_amount(asset) <= v.spending_cap(asset));
        }
        assert_eq!(v.spent_amount(asset), 8);
    }

    #[test]
    fn no_cap_means_zero_headroom() {
        let mut v = vault();
        let err = v
            .record_spending(spender(), AssetId::from_low_u64(3), 1)
            .unwrap_err();
        assert!(matches!(err, VaultError::SpendingCapExceeded { .. }));
    }

    #[test]
    fn overflowing_spend_is_rejected() {
        let mut v = vault();
        let asset = AssetId::NATIVE;
        v.set_spending_cap(owner(), asset, Amount::MAX).unwrap();
        v.record_spending(spender(), asset, Amount::MAX - 1).unwrap();

        let err = v.record_spending(spender(), asset, 2).unwrap_err();
        assert!(matches!(err, VaultError::SpendingCapExceeded { .. }));
    }

    #[test]
    fn unapproved_caller_cannot_spend() {
        let mut v = vault();
        v.set_spending_cap(owner(), AssetId::NATIVE, 100).unwrap();
        let stranger = AccountId::from_low_u64(99);
        let err = v
            .record_spending(stranger, AssetId::NATIVE, 10)
            .unwrap_err();
        assert!(matches!(err, VaultError::CallerNotApproved { .. }));
    }

    #[test]
    fn pause_blocks_spending_and_debits() {
        let mut v = vault();
        v.set_spending_cap(owner(), AssetId::NATIVE, 100).unwrap();
        v.deposit(AssetId::NATIVE, 100);
        v.pause(owner()).unwrap();

        assert!(matches!(
            v.record_spending(spender(), AssetId::NATIVE, 10),
            Err(VaultError::VaultPaused { .. })
        ));
        assert!(matches!(
            v.debit(spender(), AssetId::NATIVE, 10),
            Err(VaultError::VaultPaused { .. })
        ));

        v.unpause(owner()).unwrap();
        assert!(v.record_spending(spender(), AssetId::NATIVE, 10).is_ok());
    }

    #[test]
    fn only_owner_mutates_configuration() {
        let mut v = vault();
        let stranger = AccountId::from_low_u64(99);

        assert!(matches!(
            v.set_spending_cap(stranger, AssetId::NATIVE, 1),
            Err(VaultError::NotOwner(_))
        ));
        assert!(matches!(v.pause(stranger), Err(VaultError::NotOwner(_))));
        assert!(matches!(
            v.approve_caller(stranger, stranger),
            Err(VaultError::NotOwner(_))
        ));
        assert!(matches!(
            v.reset_usage_tracker(stranger, AssetId::NATIVE),
            Err(VaultError::NotOwner(_))
        ));
    }

    #[test]
    fn approve_and_revoke_are_idempotent() {
        let mut v = vault();
        let addr = AccountId::from_low_u64(7);
        v.approve_caller(owner(), addr).unwrap();
        v.approve_caller(owner(), addr).unwrap();
        assert!(v.is_approved_caller(addr));

        v.revoke_caller(owner(), addr).unwrap();
        v.revoke_caller(owner(), addr).unwrap();
        assert!(!v.is_approved_caller(addr));
    }

    #[test]
    fn approving_the_null_account_is_rejected() {
        let mut v = vault();
        assert!(matches!(
            v.approve_caller(owner(), AccountId::ZERO),
            Err(VaultError::InvalidAccount)
        ));
    }

    #[test]
    fn reset_usage_keeps_the_cap() {
        let mut v = vault();
        let asset = AssetId::NATIVE;
        v.set_spending_cap(owner(), asset, 100).unwrap();
        v.record_spending(spender(), asset, 70).unwrap();

        v.reset_usage_tracker(owner(), asset).unwrap();
        assert_eq!(v.spending_cap(asset), 100);
        assert_eq!(v.remaining_cap(asset), 100);
    }

    #[test]
    fn debit_checks_balance() {
        let mut v = vault();
        v.deposit(AssetId::NATIVE, 50);

        let err = v.debit(spender(), AssetId::NATIVE, 60).unwrap_err();
        assert!(matches!(err, VaultError::InsufficientBalance { .. }));

        v.debit(spender(), AssetId::NATIVE, 30).unwrap();
        assert_eq!(v.balance_of(AssetId::NATIVE), 20);
    }
}
