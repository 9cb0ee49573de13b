//! Reference trigger and action plugins for Autoflow.
//!
//! These are the concrete collaborators the execution core consumes
//! through the `autoflow-core` capability traits:
//!
//! - **[`schedule`]** -- [`ScheduleTrigger`], a cron-expression time
//!   trigger.
//! - **[`price`]** -- the [`PriceFeed`] capability, [`StaticPriceFeed`],
//!   and [`PriceThresholdTrigger`].
//! - **[`transfer`]** -- [`TransferAction`], a cap-gated vault transfer.
//! - **[`swap`]** -- [`SwapAction`], a quoted swap with slippage and
//!   deadline bounds.
//! - **[`relay`]** -- [`RelayAction`] over a [`DomainMessenger`] transport,
//!   plus the [`LoopbackMessenger`] test double.
//!
//! [`DomainMessenger`]: autoflow_core::DomainMessenger

pub mod price;
pub mod relay;
pub mod schedule;
pub mod swap;
pub mod transfer;

pub use price::{PriceFeed, PriceThresholdTrigger, StaticPriceFeed};
pub use relay::{LoopbackMessenger, RelayAction};
pub use schedule::ScheduleTrigger;
pub use swap::SwapAction;
pub use transfer::TransferAction;
