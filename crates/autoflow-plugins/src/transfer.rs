//! Cap-gated transfer action.
//!
//! Spends from the executing vault: usage is recorded against the asset's
//! spending cap, the balance is debited, and the recipient vault (when one
//! exists in the same store) is credited.  Transfers to accounts without a
//! vault leave the system and are debit-only.
//!
//! The action runs under the engine operator's identity, which vault
//! owners must have approved.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use autoflow_core::{AccountId, Action, Amount, AssetId, PluginFault};
use autoflow_vault::VaultStore;

#[derive(Debug, Deserialize)]
struct TransferPayload {
    #[serde(default)]
    asset: Option<AssetId>,
    to: AccountId,
    amount: Amount,
}

/// Transfer an asset out of the vault.
///
/// Payload: `{"asset"?: "<hex>", "to": "<hex>", "amount": n}`; the asset
/// defaults to native.
pub struct TransferAction {
    vaults: VaultStore,
    operator: AccountId,
}

impl TransferAction {
    pub fn new(vaults: VaultStore, operator: AccountId) -> Self {
        Self { vaults, operator }
    }
}

#[async_trait]
impl Action for TransferAction {
    async fn execute(&self, vault: AccountId, action_data: &Value) -> Result<(), PluginFault> {
        let payload: TransferPayload = serde_json::from_value(action_data.clone())
            .map_err(|e| PluginFault::new(format!("invalid transfer payload: {e}")))?;
        let asset = payload.asset.unwrap_or(AssetId::NATIVE);

        let balance = self
            .vaults
            .balance_of(vault, asset)
            .map_err(|e| PluginFault::new(e.to_string()))?;
        if balance < payload.amount {
            return Err(PluginFault::new(format!(
                "insufficient balance for asset {asset}: requested {}, available {balance}",
                payload.amount
            )));
        }

        self.vaults
            .record_spending(vault, self.operator, asset, payload.amount)
            .map_err(|e| PluginFault::new(e.to_string()))?;
        self.vaults
            .debit(vault, self.operator, asset, payload.amount)
            .map_err(|e| PluginFault::new(e.to_string()))?;

        if self.vaults.exists(payload.to) {
            self.vaults
                .deposit(payload.to, asset, payload.amount)
                .map_err(|e| PluginFault::new(e.to_string()))?;
        } else {
            tracing::debug!(to = %payload.to, "transfer recipient has no vault; funds leave the system");
        }

        tracing::info!(
            vault = %vault,
            to = %payload.to,
            asset = %asset,
            amount = payload.amount,
            "transfer executed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::{EventBus, SystemClock};
    use serde_json::json;
    use std::sync::Arc;

    fn operator() -> AccountId {
        AccountId::from_low_u64(10)
    }

    fn owner() -> AccountId {
        AccountId::from_low_u64(1)
    }

    fn recipient() -> AccountId {
        AccountId::from_low_u64(2)
    }

    fn setup() -> (VaultStore, TransferAction) {
        let vaults = VaultStore::new(EventBus::new(64), Arc::new(SystemClock));
        vaults.open(owner()).unwrap();
        vaults.approve_caller(owner(), owner(), operator()).unwrap();
        vaults
            .set_spending_cap(owner(), owner(), AssetId::NATIVE, 100)
            .unwrap();
        vaults.deposit(owner(), AssetId::NATIVE, 1_000).unwrap();
        let action = TransferAction::new(vaults.clone(), operator());
        (vaults, action)
    }

    #[tokio::test]
    async fn transfer_moves_funds_between_vaults() {
        let (vaults, action) = setup();
        vaults.open(recipient()).unwrap();

        action
            .execute(
                owner(),
                &json!({"to": recipient().to_string(), "amount": 60}),
            )
            .await
            .unwrap();

        assert_eq!(vaults.balance_of(owner(), AssetId::NATIVE).unwrap(), 940);
        assert_eq!(vaults.balance_of(recipient(), AssetId::NATIVE).unwrap(), 60);
        assert_eq!(vaults.remaining_cap(owner(), AssetId::NATIVE).unwrap(), 40);
    }

    #[tokio::test]
    async fn transfer_to_an_external_account_only_debits() {
        let (vaults, action) = setup();

        action
            .execute(
                owner(),
                &json!({"to": recipient().to_string(), "amount": 10}),
            )
            .await
            .unwrap();

        assert_eq!(vaults.balance_of(owner(), AssetId::NATIVE).unwrap(), 990);
        assert!(!vaults.exists(recipient()));
    }

    #[tokio::test]
    async fn cap_violation_surfaces_as_a_fault() {
        let (_vaults, action) = setup();

        let fault = action
            .execute(
                owner(),
                &json!({"to": recipient().to_string(), "amount": 150}),
            )
            .await
            .unwrap_err();
        assert!(fault.reason.contains("spending cap exceeded"));
    }

    #[tokio::test]
    async fn insufficient_balance_surfaces_as_a_fault() {
        let (vaults, action) = setup();
        // Raise the cap so balance is the binding constraint.
        vaults
            .set_spending_cap(owner(), owner(), AssetId::NATIVE, 10_000)
            .unwrap();

        let fault = action
            .execute(
                owner(),
                &json!({"to": recipient().to_string(), "amount": 5_000}),
            )
            .await
            .unwrap_err();
        assert!(fault.reason.contains("insufficient balance"));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_fault() {
        let (_vaults, action) = setup();
        let fault = action
            .execute(owner(), &json!({"amount": 10}))
            .await
            .unwrap_err();
        assert!(fault.reason.contains("invalid transfer payload"));
    }
}
