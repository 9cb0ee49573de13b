//! Engine configuration.
//!
//! Deployments describe the engine in a TOML file:
//!
//! ```toml
//! operator = "0x000000000000000000000000000000000000000a"
//! treasury = "0x000000000000000000000000000000000000000b"
//! execution_fee = 10
//! protocol_fee_bps = 2000
//! enforce_rate_limit = true
//! strict_action_resolution = true
//! ```
//!
//! `operator` is both the admin identity for plugin registration and the
//! approved-caller identity the engine uses to debit vaults for fees.

use std::path::Path;

use serde::{Deserialize, Serialize};

use autoflow_core::{AccountId, Amount, AssetId, BPS_DENOMINATOR};

use crate::error::{EngineError, Result};

/// Static configuration for a [`FlowExecutor`](crate::executor::FlowExecutor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Admin identity for plugin registration; also the identity the engine
    /// debits vaults with, so vault owners must approve it.
    pub operator: AccountId,

    /// Account accruing the protocol's share of every fee.
    pub treasury: AccountId,

    /// Flat fee collected from the vault on each successful execution.
    /// Zero disables fee collection entirely.
    #[serde(default)]
    pub execution_fee: Amount,

    /// Asset the fee is collected in.
    #[serde(default = "default_fee_asset")]
    pub fee_asset: AssetId,

    /// Protocol share of the fee, in basis points (10_000 = 100%).
    #[serde(default)]
    pub protocol_fee_bps: u16,

    /// Whether the rate limiter gates execution attempts.
    #[serde(default = "default_true")]
    pub enforce_rate_limit: bool,

    /// Hardened deployments treat an unregistered action type as a hard
    /// failure; lenient ones convert it into a soft skip.
    #[serde(default = "default_true")]
    pub strict_action_resolution: bool,
}

fn default_fee_asset() -> AssetId {
    AssetId::NATIVE
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// A fee-less, strict configuration for the given operator and treasury.
    pub fn new(operator: AccountId, treasury: AccountId) -> Self {
        Self {
            operator,
            treasury,
            execution_fee: 0,
            fee_asset: AssetId::NATIVE,
            protocol_fee_bps: 0,
            enforce_rate_limit: true,
            strict_action_resolution: true,
        }
    }

    pub fn with_fee(mut self, fee: Amount, protocol_fee_bps: u16) -> Self {
        self.execution_fee = fee;
        self.protocol_fee_bps = protocol_fee_bps;
        self
    }

    pub fn with_fee_asset(mut self, asset: AssetId) -> Self {
        self.fee_asset = asset;
        self
    }

    /// Check the configuration for structural mistakes.
    pub fn validate(&self) -> Result<()> {
        if self.operator.is_zero() {
            return Err(EngineError::InvalidConfig {
                reason: "operator must not be the null account".to_string(),
            });
        }
        if self.treasury.is_zero() {
            return Err(EngineError::InvalidConfig {
                reason: "treasury must not be the null account".to_string(),
            });
        }
        if u64::from(self.protocol_fee_bps) > BPS_DENOMINATOR {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "protocol_fee_bps {} exceeds {BPS_DENOMINATOR}",
                    self.protocol_fee_bps
                ),
            });
        }
        Ok(())
    }

    /// Load and validate a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn operator() -> AccountId {
        AccountId::from_low_u64(10)
    }

    fn treasury() -> AccountId {
        AccountId::from_low_u64(11)
    }

    #[test]
    fn defaults_are_strict_and_fee_less() {
        let config = EngineConfig::new(operator(), treasury());
        config.validate().unwrap();
        assert_eq!(config.execution_fee, 0);
        assert!(config.enforce_rate_limit);
        assert!(config.strict_action_resolution);
        assert!(config.fee_asset.is_native());
    }

    #[test]
    fn excessive_bps_is_rejected() {
        let config = EngineConfig::new(operator(), treasury()).with_fee(10, 10_001);
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn null_identities_are_rejected() {
        let config = EngineConfig::new(AccountId::ZERO, treasury());
        assert!(config.validate().is_err());

        let config = EngineConfig::new(operator(), AccountId::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_parsing_applies_defaults() {
        let text = format!(
            "operator = \"{}\"\ntreasury = \"{}\"\nexecution_fee = 10\nprotocol_fee_bps = 2000\n",
            operator(),
            treasury()
        );
        let config: EngineConfig = toml::from_str(&text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.execution_fee, 10);
        assert_eq!(config.protocol_fee_bps, 2000);
        // Omitted fields fall back to defaults.
        assert!(config.enforce_rate_limit);
        assert!(config.fee_asset.is_native());
    }

    #[test]
    fn file_loading_validates() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "operator = \"{}\"\ntreasury = \"{}\"\nprotocol_fee_bps = 60000",
            operator(),
            treasury()
        )
        .unwrap();

        let result = EngineConfig::from_toml_file(file.path());
        assert!(result.is_err());
    }
}
