//! Balance-condition decoding.
//!
//! A flow's optional `condition_data` payload encodes a minimum-balance
//! requirement checked directly against the vault's balances (not through
//! the spending cap):
//!
//! ```json
//! { "min_balance": 500, "asset": "0x00000000000000000000000000000000000000aa" }
//! ```
//!
//! The `asset` field is optional; when absent the native asset is checked.
//! A malformed payload is a structural (hard) error — it represents a
//! configuration bug, not a business outcome.

use serde::Deserialize;
use serde_json::Value;

use autoflow_core::{Amount, AssetId};

use crate::error::{EngineError, Result};

/// Decoded minimum-balance requirement.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceCondition {
    pub min_balance: Amount,
    #[serde(default)]
    pub asset: Option<AssetId>,
}

impl BalanceCondition {
    /// Decode a condition payload.
    pub fn decode(data: &Value) -> Result<Self> {
        serde_json::from_value(data.clone()).map_err(|e| EngineError::InvalidCondition {
            reason: e.to_string(),
        })
    }

    /// The asset to check; defaults to the native asset.
    pub fn asset(&self) -> AssetId {
        self.asset.unwrap_or(AssetId::NATIVE)
    }
}
