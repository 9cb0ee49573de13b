//! Cross-domain relay action.
//!
//! Serializes the action payload and hands it to the configured
//! [`DomainMessenger`].  The engine appends this action automatically for
//! flows with a destination domain; the payload therefore always carries a
//! `domain` field.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use autoflow_core::{AccountId, Action, DomainId, DomainMessenger, PluginFault};

#[derive(Debug, Deserialize)]
struct RelayPayload {
    domain: u32,
}

/// Relay the payload to another execution domain.
///
/// Payload: `{"domain": n, ...}` — everything beyond `domain` travels
/// opaquely to the remote side.
pub struct RelayAction {
    messenger: Arc<dyn DomainMessenger>,
}

impl RelayAction {
    pub fn new(messenger: Arc<dyn DomainMessenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl Action for RelayAction {
    async fn execute(&self, vault: AccountId, action_data: &Value) -> Result<(), PluginFault> {
        let payload: RelayPayload = serde_json::from_value(action_data.clone())
            .map_err(|e| PluginFault::new(format!("invalid relay payload: {e}")))?;
        let domain = DomainId(payload.domain);

        let bytes = serde_json::to_vec(action_data)
            .map_err(|e| PluginFault::new(format!("relay payload encoding failed: {e}")))?;

        self.messenger.send(domain, bytes).await?;

        tracing::info!(vault = %vault, domain = %domain, "relay dispatched");
        Ok(())
    }
}

/// Test transport that records every send.
#[derive(Default)]
pub struct LoopbackMessenger {
    sent: Mutex<Vec<(DomainId, Vec<u8>)>>,
}

impl LoopbackMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<(DomainId, Vec<u8>)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DomainMessenger for LoopbackMessenger {
    async fn send(&self, domain: DomainId, payload: Vec<u8>) -> Result<(), PluginFault> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((domain, payload));
        Ok(())
    }
}
