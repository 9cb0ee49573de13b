//! Core identifier and amount types shared by every Autoflow crate.
//!
//! Accounts and assets are 20-byte identifiers rendered as `0x`-prefixed hex
//! strings in logs and on the wire.  The all-zero value is a sentinel: for
//! accounts it is the "null account" rejected by configuration APIs, for
//! assets it designates the native asset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Asset quantity in minor units.
pub type Amount = u64;

/// Basis-point denominator: 10_000 bps == 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

/// Error returned when a textual identifier cannot be parsed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid identifier `{input}`: {reason}")]
pub struct ParseIdError {
    pub input: String,
    pub reason: String,
}

fn decode_hex_20(s: &str) -> Result<[u8; 20], ParseIdError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 40 {
        return Err(ParseIdError {
            input: s.to_string(),
            reason: format!("expected 40 hex digits, got {}", digits.len()),
        });
    }
    let mut out = [0u8; 20];
    for (i, chunk) in digits.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).map_err(|_| ParseIdError {
            input: s.to_string(),
            reason: "non-ascii hex digit".to_string(),
        })?;
        out[i] = u8::from_str_radix(pair, 16).map_err(|_| ParseIdError {
            input: s.to_string(),
            reason: format!("invalid hex pair `{pair}`"),
        })?;
    }
    Ok(out)
}

fn fmt_hex_20(f: &mut fmt::Formatter<'_>, bytes: &[u8; 20]) -> fmt::Result {
    write!(f, "0x")?;
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

macro_rules! impl_hex_codecs {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_hex_20(f, &self.0)
            }
        }

        impl FromStr for $ty {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_hex_20(s).map(Self)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A 20-byte account identifier (vault owners, executors, the treasury).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; 20]);

impl AccountId {
    /// The null account.  Rejected wherever an account must be real.
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an account id from a small integer.  Handy in tests and wiring
    /// code where the exact bytes do not matter.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl_hex_codecs!(AccountId);

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A 20-byte asset identifier.  The all-zero id is the native asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId([u8; 20]);

impl AssetId {
    /// The native asset of the host ledger.
    pub const NATIVE: Self = Self([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn is_native(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl_hex_codecs!(AssetId);

// ---------------------------------------------------------------------------
// Flow / domain identifiers
// ---------------------------------------------------------------------------

/// Monotonically assigned flow identifier.  Never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination execution-domain tag for cross-domain flows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DomainId(pub u32);

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Plugin type tags
// ---------------------------------------------------------------------------

/// Numeric tag identifying a trigger plugin type.
///
/// Tags `1..=MAX_SUPPORTED` are accepted at flow creation; anything outside
/// that range is a structural error regardless of what plugins happen to be
/// registered at the time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TriggerKind(pub u16);

impl TriggerKind {
    /// Cron-style schedule trigger.
    pub const SCHEDULE: Self = Self(1);
    /// Asset-price threshold trigger.
    pub const PRICE_THRESHOLD: Self = Self(2);

    /// Upper bound of the supported tag range.
    pub const MAX_SUPPORTED: u16 = 16;

    pub fn is_supported(self) -> bool {
        (1..=Self::MAX_SUPPORTED).contains(&self.0)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric tag identifying an action plugin type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActionKind(pub u16);

impl ActionKind {
    /// Cap-gated asset transfer out of the vault.
    pub const TRANSFER: Self = Self(1);
    /// Price-feed-quoted asset swap.
    pub const SWAP: Self = Self(2);
    /// Cross-domain relay via the configured messenger.
    pub const RELAY: Self = Self(3);
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_hex_round_trip() {
        let id = AccountId::from_low_u64(0xdead_beef);
        let text = id.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<AccountId>().unwrap(), id);
    }

    #[test]
    fn account_parse_rejects_bad_input() {
        assert!("0x1234".parse::<AccountId>().is_err());
        assert!("zz".repeat(20).parse::<AccountId>().is_err());
    }

    #[test]
    fn zero_sentinels() {
        assert!(AccountId::ZERO.is_zero());
        assert!(!AccountId::from_low_u64(1).is_zero());
        assert!(AssetId::NATIVE.is_native());
        assert!(!AssetId::from_low_u64(7).is_native());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let id = AccountId::from_low_u64(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn trigger_kind_support_range() {
        assert!(TriggerKind::SCHEDULE.is_supported());
        assert!(TriggerKind::PRICE_THRESHOLD.is_supported());
        assert!(!TriggerKind(0).is_supported());
        assert!(!TriggerKind(TriggerKind::MAX_SUPPORTED + 1).is_supported());
    }
}
