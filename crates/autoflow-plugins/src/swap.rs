//! Price-feed-quoted swap action.
//!
//! Swaps one vault asset for another at the feed's quoted prices.  The
//! payload encodes its own protections: a minimum acceptable output
//! (slippage bound) and an optional unix-seconds deadline checked against
//! the clock before anything moves.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use autoflow_core::{AccountId, Action, Amount, AssetId, Clock, PluginFault};
use autoflow_vault::VaultStore;

use crate::price::PriceFeed;

#[derive(Debug, Deserialize)]
struct SwapPayload {
    asset_in: AssetId,
    asset_out: AssetId,
    amount_in: Amount,
    min_out: Amount,
    #[serde(default)]
    deadline: Option<i64>,
}

/// Swap `asset_in` for `asset_out` inside the vault.
///
/// Payload: `{"asset_in", "asset_out", "amount_in", "min_out",
/// "deadline"?}`.
pub struct SwapAction {
    vaults: VaultStore,
    feed: Arc<dyn PriceFeed>,
    clock: Arc<dyn Clock>,
    operator: AccountId,
}

impl SwapAction {
    pub fn new(
        vaults: VaultStore,
        feed: Arc<dyn PriceFeed>,
        clock: Arc<dyn Clock>,
        operator: AccountId,
    ) -> Self {
        Self {
            vaults,
            feed,
            clock,
            operator,
        }
    }

    fn quote(&self, payload: &SwapPayload) -> Result<Amount, PluginFault> {
        let price_in = self
            .feed
            .price_of(payload.asset_in)
            .ok_or_else(|| PluginFault::new(format!("no quote for asset {}", payload.asset_in)))?;
        let price_out = self
            .feed
            .price_of(payload.asset_out)
            .ok_or_else(|| PluginFault::new(format!("no quote for asset {}", payload.asset_out)))?;
        if price_out == 0 {
            return Err(PluginFault::new(format!(
                "zero quote for asset {}",
                payload.asset_out
            )));
        }

        let out = u128::from(payload.amount_in) * u128::from(price_in) / u128::from(price_out);
        Ok(Amount::try_from(out).unwrap_or(Amount::MAX))
    }
}

#[async_trait]
impl Action for SwapAction {
    async fn execute(&self, vault: AccountId, action_data: &Value) -> Result<(), PluginFault> {
        let payload: SwapPayload = serde_json::from_value(action_data.clone())
            .map_err(|e| PluginFault::new(format!("invalid swap payload: {e}")))?;

        if let Some(deadline) = payload.deadline {
            if self.clock.now().timestamp() > deadline {
                return Err(PluginFault::new("swap deadline exceeded"));
            }
        }

        let out = self.quote(&payload)?;
        if out < payload.min_out {
            return Err(PluginFault::new(format!(
                "swap output {out} below minimum {}",
                payload.min_out
            )));
        }

        let balance = self
            .vaults
            .balance_of(vault, payload.asset_in)
            .map_err(|e| PluginFault::new(e.to_string()))?;
        if balance < payload.amount_in {
            return Err(PluginFault::new(format!(
                "insufficient balance for asset {}: requested {}, available {balance}",
                payload.asset_in, payload.amount_in
            )));
        }

        self.vaults
            .record_spending(vault, self.operator, payload.asset_in, payload.amount_in)
            .map_err(|e| PluginFault::new(e.to_string()))?;
        self.vaults
            .debit(vault, self.operator, payload.asset_in, payload.amount_in)
            .map_err(|e| PluginFault::new(e.to_string()))?;
        self.vaults
            .deposit(vault, payload.asset_out, out)
            .map_err(|e| PluginFault::new(e.to_string()))?;

        tracing::info!(
            vault = %vault,
            asset_in = %payload.asset_in,
            asset_out = %payload.asset_out,
            amount_in = payload.amount_in,
            amount_out = out,
            "swap executed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::StaticPriceFeed;
    use autoflow_core::{EventBus, ManualClock};
    use chrono::Duration;
    use serde_json::json;

    fn operator() -> AccountId {
        AccountId::from_low_u64(10)
    }

    fn owner() -> AccountId {
        AccountId::from_low_u64(1)
    }

    fn usd() -> AssetId {
        AssetId::from_low_u64(0xaa)
    }

    fn eth() -> AssetId {
        AssetId::from_low_u64(0xbb)
    }

    fn setup() -> (VaultStore, Arc<ManualClock>, SwapAction) {
        let clock = Arc::new(ManualClock::starting_now());
        let vaults = VaultStore::new(EventBus::new(64), clock.clone());
        vaults.open(owner()).unwrap();
        vaults.approve_caller(owner(), owner(), operator()).unwrap();
        vaults.set_spending_cap(owner(), owner(), usd(), 10_000).unwrap();
        vaults.deposit(owner(), usd(), 10_000).unwrap();

        let feed = StaticPriceFeed::new();
        feed.set_price(usd(), 1);
        feed.set_price(eth(), 2_000);

        let action = SwapAction::new(vaults.clone(), Arc::new(feed), clock.clone(), operator());
        (vaults, clock, action)
    }

    #[tokio::test]
    async fn swap_converts_at_quoted_prices() {
        let (vaults, _clock, action) = setup();

        action
            .execute(
                owner(),
                &json!({
                    "asset_in": usd().to_string(),
                    "asset_out": eth().to_string(),
                    "amount_in": 4_000,
                    "min_out": 2,
                }),
            )
            .await
            .unwrap();

        assert_eq!(vaults.balance_of(owner(), usd()).unwrap(), 6_000);
        assert_eq!(vaults.balance_of(owner(), eth()).unwrap(), 2);
        assert_eq!(vaults.remaining_cap(owner(), usd()).unwrap(), 6_000);
    }

    #[tokio::test]
    async fn slippage_bound_rejects_thin_output() {
        let (_vaults, _clock, action) = setup();

        let fault = action
            .execute(
                owner(),
                &json!({
                    "asset_in": usd().to_string(),
                    "asset_out": eth().to_string(),
                    "amount_in": 4_000,
                    "min_out": 3,
                }),
            )
            .await
            .unwrap_err();
        assert!(fault.reason.contains("below minimum"));
    }

    #[tokio::test]
    async fn expired_deadline_rejects_the_swap() {
        let (_vaults, clock, action) = setup();
        let deadline = clock.now().timestamp();
        clock.advance(Duration::seconds(30));

        let fault = action
            .execute(
                owner(),
                &json!({
                    "asset_in": usd().to_string(),
                    "asset_out": eth().to_string(),
                    "amount_in": 100,
                    "min_out": 0,
                    "deadline": deadline,
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(fault.reason, "swap deadline exceeded");
    }

    #[tokio::test]
    async fn missing_quote_is_a_fault() {
        let (_vaults, _clock, action) = setup();
        let unknown = AssetId::from_low_u64(0xcc);

        let fault = action
            .execute(
                owner(),
                &json!({
                    "asset_in": usd().to_string(),
                    "asset_out": unknown.to_string(),
                    "amount_in": 100,
                    "min_out": 0,
                }),
            )
            .await
            .unwrap_err();
        assert!(fault.reason.contains("no quote"));
    }
}
