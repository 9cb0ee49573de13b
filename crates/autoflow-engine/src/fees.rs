//! Fee split and accrual.
//!
//! Each successful execution collects a flat fee from the vault and splits
//! it between the protocol treasury and the calling executor:
//!
//! `protocol = fee * protocol_fee_bps / 10_000`, `executor = fee - protocol`.
//!
//! Shares accrue in a [`FeeLedger`] keyed by account; recipients drain
//! their balance with [`FeeLedger::take`].

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use autoflow_core::{AccountId, Amount, BPS_DENOMINATOR};

/// The two halves of a collected fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub protocol: Amount,
    pub executor: Amount,
}

impl FeeSplit {
    pub const ZERO: Self = Self {
        protocol: 0,
        executor: 0,
    };

    pub fn total(&self) -> Amount {
        self.protocol + self.executor
    }
}

/// Split `fee` at `protocol_fee_bps` basis points.
///
/// The intermediate product is widened so the multiplication cannot
/// overflow; with `protocol_fee_bps <= 10_000` the protocol share never
/// exceeds the fee.
pub fn split_fee(fee: Amount, protocol_fee_bps: u16) -> FeeSplit {
    let protocol =
        (u128::from(fee) * u128::from(protocol_fee_bps) / u128::from(BPS_DENOMINATOR)) as Amount;
    FeeSplit {
        protocol,
        executor: fee - protocol,
    }
}

/// Accrued fee balances per account.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct FeeLedger {
    accrued: Arc<DashMap<AccountId, Amount>>,
}

impl FeeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to an account's accrued balance.
    pub fn credit(&self, account: AccountId, amount: Amount) {
        if amount == 0 {
            return;
        }
        let mut entry = self.accrued.entry(account).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Current accrued balance.
    pub fn balance(&self, account: AccountId) -> Amount {
        self.accrued.get(&account).map(|e| *e.value()).unwrap_or(0)
    }

    /// Drain and return the account's accrued balance.
    pub fn take(&self, account: AccountId) -> Amount {
        self.accrued.remove(&account).map(|(_, v)| v).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_at_twenty_percent() {
        let split = split_fee(100, 2_000);
        assert_eq!(split.protocol, 20);
        assert_eq!(split.executor, 80);
        assert_eq!(split.total(), 100);
    }

    #[test]
    fn rounding_favors_the_executor() {
        // 33 bps of 100 is 0.33, truncated to 0.
        let split = split_fee(100, 33);
        assert_eq!(split.protocol, 0);
        assert_eq!(split.executor, 100);

        let split = split_fee(1_000, 33);
        assert_eq!(split.protocol, 3);
        assert_eq!(split.executor, 997);
    }

    #[test]
    fn boundary_shares() {
        assert_eq!(split_fee(100, 0), FeeSplit { protocol: 0, executor: 100 });
        assert_eq!(
            split_fee(100, 10_000),
            FeeSplit {
                protocol: 100,
                executor: 0
            }
        );
        assert_eq!(split_fee(0, 5_000), FeeSplit::ZERO);
    }

    #[test]
    fn large_fee_does_not_overflow() {
        let split = split_fee(Amount::MAX, 10_000);
        assert_eq!(split.protocol, Amount::MAX);
        assert_eq!(split.executor, 0);
    }

    #[test]
    fn ledger_accrues_and_drains() {
        let ledger = FeeLedger::new();
        let account = AccountId::from_low_u64(1);

        ledger.credit(account, 10);
        ledger.credit(account, 15);
        assert_eq!(ledger.balance(account), 25);

        assert_eq!(ledger.take(account), 25);
        assert_eq!(ledger.balance(account), 0);
        assert_eq!(ledger.take(account), 0);
    }
}
