//! Price feed capability and the price-threshold trigger.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;

use autoflow_core::{Amount, AssetId, FlowId, PluginFault, Trigger};

/// Source of asset prices, quoted in native minor units.
pub trait PriceFeed: Send + Sync {
    fn price_of(&self, asset: AssetId) -> Option<Amount>;
}

/// In-memory price feed for tests and wiring code.
#[derive(Clone, Default)]
pub struct StaticPriceFeed {
    prices: Arc<DashMap<AssetId, Amount>>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, asset: AssetId, price: Amount) {
        self.prices.insert(asset, price);
    }
}

impl PriceFeed for StaticPriceFeed {
    fn price_of(&self, asset: AssetId) -> Option<Amount> {
        self.prices.get(&asset).map(|e| *e.value())
    }
}

#[derive(Debug, Deserialize)]
struct PricePayload {
    asset: AssetId,
    #[serde(default)]
    min_price: Option<Amount>,
    #[serde(default)]
    max_price: Option<Amount>,
}

/// Trigger that fires while an asset's quote sits inside the configured
/// bounds.
///
/// Payload: `{"asset": "<hex>", "min_price"?: n, "max_price"?: n}`.  A
/// missing quote is a structured fault, not "not met" — the flow owner
/// should know the feed has a hole.
pub struct PriceThresholdTrigger {
    feed: Arc<dyn PriceFeed>,
}

impl PriceThresholdTrigger {
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Trigger for PriceThresholdTrigger {
    async fn is_met(&self, flow_id: FlowId, trigger_data: &Value) -> Result<bool, PluginFault> {
        let payload: PricePayload = serde_json::from_value(trigger_data.clone())
            .map_err(|e| PluginFault::new(format!("invalid price trigger payload: {e}")))?;

        let price = self
            .feed
            .price_of(payload.asset)
            .ok_or_else(|| PluginFault::new(format!("no quote for asset {}", payload.asset)))?;

        let met = payload.min_price.is_none_or(|min| price >= min)
            && payload.max_price.is_none_or(|max| price <= max);

        tracing::debug!(flow_id = %flow_id, asset = %payload.asset, price, met, "price trigger evaluated");
        Ok(met)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset() -> AssetId {
        AssetId::from_low_u64(0xaa)
    }

    fn trigger_with_price(price: Amount) -> PriceThresholdTrigger {
        let feed = StaticPriceFeed::new();
        feed.set_price(asset(), price);
        PriceThresholdTrigger::new(Arc::new(feed))
    }

    #[tokio::test]
    async fn min_bound() {
        let trigger = trigger_with_price(150);
        let data = json!({"asset": asset().to_string(), "min_price": 100});
        assert!(trigger.is_met(FlowId(1), &data).await.unwrap());

        let data = json!({"asset": asset().to_string(), "min_price": 200});
        assert!(!trigger.is_met(FlowId(1), &data).await.unwrap());
    }

    #[tokio::test]
    async fn band_bounds() {
        let trigger = trigger_with_price(150);
        let data = json!({
            "asset": asset().to_string(),
            "min_price": 100,
            "max_price": 200,
        });
        assert!(trigger.is_met(FlowId(1), &data).await.unwrap());

        let data = json!({"asset": asset().to_string(), "max_price": 120});
        assert!(!trigger.is_met(FlowId(1), &data).await.unwrap());
    }

    #[tokio::test]
    async fn missing_quote_is_a_fault() {
        let trigger = PriceThresholdTrigger::new(Arc::new(StaticPriceFeed::new()));
        let data = json!({"asset": asset().to_string(), "min_price": 1});
        let fault = trigger.is_met(FlowId(1), &data).await.unwrap_err();
        assert!(fault.reason.contains("no quote"));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_fault() {
        let trigger = trigger_with_price(1);
        let fault = trigger
            .is_met(FlowId(1), &json!({"min_price": 1}))
            .await
            .unwrap_err();
        assert!(fault.reason.contains("invalid price trigger payload"));
    }
}
