//! Concurrent vault collection.
//!
//! [`VaultStore`] holds one [`VaultAccount`] per account id in a [`DashMap`]
//! and is the public surface the rest of the system goes through.  Each
//! operation locks exactly one vault entry, so check-then-update sequences
//! (cap headroom, balances, the pause flag) are atomic per vault: of two
//! racing spends that would jointly exceed a cap, exactly one succeeds and
//! the other observes the committed usage.
//!
//! Every state-changing operation publishes a [`FlowEvent`] and emits a
//! structured tracing record.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use autoflow_core::{AccountId, Amount, AssetId, Clock, EventBus, FlowEvent};

use crate::account::VaultAccount;
use crate::error::{Result, VaultError};

/// Concurrent vault registry backed by [`DashMap`].
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct VaultStore {
    inner: Arc<VaultStoreInner>,
}

struct VaultStoreInner {
    vaults: DashMap<AccountId, VaultAccount>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl VaultStore {
    pub fn new(bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(VaultStoreInner {
                vaults: DashMap::new(),
                bus,
                clock,
            }),
        }
    }

    /// Create a vault owned by `owner`.
    ///
    /// Fails with [`VaultError::VaultAlreadyExists`] when the account
    /// already has one, and rejects the null account.
    pub fn open(&self, owner: AccountId) -> Result<()> {
        if owner.is_zero() {
            return Err(VaultError::InvalidAccount);
        }
        let now = self.inner.clock.now();
        match self.inner.vaults.entry(owner) {
            Entry::Occupied(_) => Err(VaultError::VaultAlreadyExists { vault: owner }),
            Entry::Vacant(slot) => {
                slot.insert(VaultAccount::new(owner, now));
                tracing::info!(vault = %owner, "vault opened");
                Ok(())
            }
        }
    }

    pub fn exists(&self, vault: AccountId) -> bool {
        self.inner.vaults.contains_key(&vault)
    }

    // -- Spending caps -------------------------------------------------------

    /// Set the per-asset ceiling and reset its usage window.  Owner-only.
    pub fn set_spending_cap(
        &self,
        vault: AccountId,
        caller: AccountId,
        asset: AssetId,
        cap: Amount,
    ) -> Result<()> {
        self.with_vault_mut(vault, |v| v.set_spending_cap(caller, asset, cap))?;
        tracing::info!(vault = %vault, asset = %asset, cap, "spending cap set");
        self.inner.bus.publish(FlowEvent::SpendingCapSet {
            vault,
            asset,
            cap,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn spending_cap(&self, vault: AccountId, asset: AssetId) -> Result<Amount> {
        self.with_vault(vault, |v| v.spending_cap(asset))
    }

    pub fn spent_amount(&self, vault: AccountId, asset: AssetId) -> Result<Amount> {
        self.with_vault(vault, |v| v.spent_amount(asset))
    }

    /// Remaining headroom under the asset's ceiling; saturates at zero.
    pub fn remaining_cap(&self, vault: AccountId, asset: AssetId) -> Result<Amount> {
        self.with_vault(vault, |v| v.remaining_cap(asset))
    }

    /// Record spending against the ceiling.  Approved-caller-only.
    pub fn record_spending(
        &self,
        vault: AccountId,
        caller: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<Amount> {
        let remaining = self.with_vault_mut(vault, |v| v.record_spending(caller, asset, amount))?;
        tracing::debug!(vault = %vault, asset = %asset, amount, remaining, "spending recorded");
        self.inner.bus.publish(FlowEvent::SpendingRecorded {
            vault,
            asset,
            amount,
            remaining,
            timestamp: self.inner.clock.now(),
        });
        Ok(remaining)
    }

    /// Zero the usage tracker without changing the ceiling.  Owner-only.
    pub fn reset_usage_tracker(
        &self,
        vault: AccountId,
        caller: AccountId,
        asset: AssetId,
    ) -> Result<()> {
        self.with_vault_mut(vault, |v| v.reset_usage_tracker(caller, asset))?;
        tracing::info!(vault = %vault, asset = %asset, "usage tracker reset");
        Ok(())
    }

    // -- Approved callers ----------------------------------------------------

    pub fn approve_caller(
        &self,
        vault: AccountId,
        caller: AccountId,
        addr: AccountId,
    ) -> Result<()> {
        self.with_vault_mut(vault, |v| v.approve_caller(caller, addr))?;
        tracing::info!(vault = %vault, approved = %addr, "caller approved");
        self.inner.bus.publish(FlowEvent::CallerApproved {
            vault,
            caller: addr,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn revoke_caller(
        &self,
        vault: AccountId,
        caller: AccountId,
        addr: AccountId,
    ) -> Result<()> {
        self.with_vault_mut(vault, |v| v.revoke_caller(caller, addr))?;
        tracing::info!(vault = %vault, revoked = %addr, "caller revoked");
        self.inner.bus.publish(FlowEvent::CallerRevoked {
            vault,
            caller: addr,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn is_approved_caller(&self, vault: AccountId, addr: AccountId) -> Result<bool> {
        self.with_vault(vault, |v| v.is_approved_caller(addr))
    }

    // -- Pause switch --------------------------------------------------------

    pub fn pause(&self, vault: AccountId, caller: AccountId) -> Result<()> {
        self.with_vault_mut(vault, |v| v.pause(caller))?;
        tracing::warn!(vault = %vault, "vault paused");
        self.inner.bus.publish(FlowEvent::VaultPaused {
            vault,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn unpause(&self, vault: AccountId, caller: AccountId) -> Result<()> {
        self.with_vault_mut(vault, |v| v.unpause(caller))?;
        tracing::info!(vault = %vault, "vault unpaused");
        self.inner.bus.publish(FlowEvent::VaultUnpaused {
            vault,
            timestamp: self.inner.clock.now(),
        });
        Ok(())
    }

    pub fn is_paused(&self, vault: AccountId) -> Result<bool> {
        self.with_vault(vault, |v| v.is_paused())
    }

    // -- Balances ------------------------------------------------------------

    /// Credit the vault balance.  Permissionless.
    pub fn deposit(&self, vault: AccountId, asset: AssetId, amount: Amount) -> Result<()> {
        self.with_vault_mut(vault, |v| {
            v.deposit(asset, amount);
            Ok(())
        })?;
        tracing::debug!(vault = %vault, asset = %asset, amount, "deposit");
        Ok(())
    }

    /// Debit the vault balance.  Approved-caller-only and pause-gated.
    pub fn debit(
        &self,
        vault: AccountId,
        caller: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<()> {
        self.with_vault_mut(vault, |v| v.debit(caller, asset, amount))?;
        tracing::debug!(vault = %vault, asset = %asset, amount, "debit");
        Ok(())
    }

    pub fn balance_of(&self, vault: AccountId, asset: AssetId) -> Result<Amount> {
        self.with_vault(vault, |v| v.balance_of(asset))
    }

    // -- Internals -----------------------------------------------------------

    fn with_vault<T>(&self, vault: AccountId, f: impl FnOnce(&VaultAccount) -> T) -> Result<T> {
        self.inner
            .vaults
            .get(&vault)
            .map(|entry| f(entry.value()))
            .ok_or(VaultError::VaultNotFound { vault })
    }

    fn with_vault_mut<T>(
        &self,
        vault: AccountId,
        f: impl FnOnce(&mut VaultAccount) -> Result<T>,
    ) -> Result<T> {
        let mut entry = self
            .inner
            .vaults
            .get_mut(&vault)
            .ok_or(VaultError::VaultNotFound { vault })?;
        f(entry.value_mut())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
