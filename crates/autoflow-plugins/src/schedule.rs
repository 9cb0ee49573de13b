//! Cron-schedule trigger.
//!
//! Fires when the current minute matches the flow's cron expression, so a
//! "every Monday at 09:00" flow is executable for the whole matching
//! minute.  Expressions are parsed via the `cron` crate which expects a
//! seconds field; standard 5-field user input is normalized by prepending
//! `0`.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Timelike;
use serde::Deserialize;
use serde_json::Value;

use autoflow_core::{Clock, FlowId, PluginFault, Trigger};

/// Normalize a cron expression to the 6/7-field format expected by the
/// `cron` crate.
fn normalize_cron_expr(expr: &str) -> String {
    let field_count = expr.split_whitespace().count();
    if field_count == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

fn parse_schedule(expr: &str) -> Result<cron::Schedule, PluginFault> {
    let normalized = normalize_cron_expr(expr);
    cron::Schedule::from_str(&normalized)
        .map_err(|e| PluginFault::new(format!("invalid cron expression `{expr}`: {e}")))
}

#[derive(Debug, Deserialize)]
struct SchedulePayload {
    cron: String,
}

/// Trigger that is met while the clock sits inside a scheduled minute.
///
/// Payload: `{"cron": "<expression>"}`.
pub struct ScheduleTrigger {
    clock: Arc<dyn Clock>,
}

impl ScheduleTrigger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl Trigger for ScheduleTrigger {
    async fn is_met(&self, flow_id: FlowId, trigger_data: &Value) -> Result<bool, PluginFault> {
        let payload: SchedulePayload = serde_json::from_value(trigger_data.clone())
            .map_err(|e| PluginFault::new(format!("invalid schedule trigger payload: {e}")))?;

        let schedule = parse_schedule(&payload.cron)?;

        let now = self.clock.now();
        let minute = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        let met = schedule.includes(minute);

        tracing::debug!(flow_id = %flow_id, cron = %payload.cron, met, "schedule trigger evaluated");
        Ok(met)
    }
}
