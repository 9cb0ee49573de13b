//! Flow execution orchestrator.
//!
//! One attempt chains, in strict order: flow resolution, the vault pause
//! check, trigger resolution and evaluation, the optional balance
//! condition, the optional rate-limit gate, action resolution for the full
//! action list, action execution, and — only on full success — execution
//! bookkeeping and the fee split.
//!
//! # Failure tiers
//!
//! Hard failures (missing flow, inactive flow, unregistered trigger,
//! authorization faults, fee-transfer failure) abort the call as
//! [`EngineError`]s.  Business-level "not yet" outcomes (paused vault,
//! unmet trigger or condition, rate limit, failed action) complete the
//! call as [`ExecutionOutcome::Skipped`] with a [`SkipReason`], leaving
//! registry counters, vault usage, and the rate limiter untouched so the
//! same flow can be retried without remediation.
//!
//! # Untrusted plugins
//!
//! Triggers and actions are adversarial.  All eligibility is validated
//! before the first untrusted call, every invocation goes through
//! `catch_unwind` (a panic becomes the generic "Unknown error" reason),
//! and a per-flow in-flight marker rejects re-entrant attempts on the same
//! flow for the duration of an attempt.
//!
//! # Ordering
//!
//! The success path is record-then-pay: registry bookkeeping, rate-limiter
//! stamp, then fee collection.  The fee debit is deliberately last; its
//! failure surfaces as the hard [`EngineError::FeeTransferFailed`] even
//! though the action itself already ran — the accepted partial-effect risk
//! of collecting payment after doing the work.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use serde_json::{Value, json};
use uuid::Uuid;

use autoflow_core::{
    AccountId, Action, ActionKind, Amount, Clock, EventBus, FlowEvent, FlowId, Trigger,
    TriggerKind,
};
use autoflow_registry::{ActionSpec, Flow, FlowRegistry, RateLimiter, RegistryError};
use autoflow_vault::VaultStore;

use crate::condition::BalanceCondition;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::fees::{FeeLedger, FeeSplit, split_fee};
use crate::plugins::PluginRegistry;

/// Reason string reported when a plugin raises an unstructured fault.
const UNKNOWN_ERROR: &str = "Unknown error";

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Business-level reason an attempt was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The owning vault's pause switch is engaged.
    VaultPaused,
    /// The trigger plugin returned false.
    TriggerNotMet,
    /// The trigger plugin raised a fault; its reason is preserved.
    TriggerFault { reason: String },
    /// The balance condition was not satisfied.
    ConditionNotMet,
    /// The rate limiter refused the attempt.
    RateLimited,
    /// An action type has no registered plugin (lenient deployments only).
    ActionNotRegistered { kind: ActionKind },
    /// An action plugin failed; its reason (or "Unknown error") is
    /// preserved.  Effects of earlier actions in the list stand.
    ActionFailed { index: usize, reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VaultPaused => f.write_str("Vault is paused"),
            Self::TriggerNotMet => f.write_str("Trigger conditions not met"),
            Self::TriggerFault { reason } => f.write_str(reason),
            Self::ConditionNotMet => f.write_str("Condition check failed"),
            Self::RateLimited => f.write_str("Rate limit exceeded"),
            Self::ActionNotRegistered { kind } => {
                write!(f, "No action plugin registered for type {kind}")
            }
            Self::ActionFailed { reason, .. } => f.write_str(reason),
        }
    }
}

/// The result of a completed execution attempt.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Every step succeeded; bookkeeping and the fee split are committed.
    Executed { attempt_id: Uuid, fee: FeeSplit },
    /// A business check failed; no tracked state was mutated by the engine.
    Skipped {
        attempt_id: Uuid,
        reason: SkipReason,
    },
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }

    /// The soft-failure reason, if any.
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Skipped { reason, .. } => Some(reason),
            Self::Executed { .. } => None,
        }
    }
}

/// Result of the read-only [`FlowExecutor::can_execute_flow`] probe.
#[derive(Debug, Clone)]
pub struct EligibilityProbe {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl EligibilityProbe {
    fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// The orchestrator tying registry, vaults, rate limiter, and plugins into
/// one atomic execution attempt.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct FlowExecutor {
    inner: Arc<FlowExecutorInner>,
}

struct FlowExecutorInner {
    config: EngineConfig,
    registry: FlowRegistry,
    vaults: VaultStore,
    limiter: Option<RateLimiter>,
    plugins: PluginRegistry,
    fees: FeeLedger,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    in_flight: DashMap<FlowId, ()>,
}

impl FlowExecutor {
    /// Build an executor over the given subsystems.
    ///
    /// Validates `config`.  Pass `None` for `limiter` in deployments that
    /// do not wire one in (the config flag is then irrelevant).
    pub fn new(
        config: EngineConfig,
        registry: FlowRegistry,
        vaults: VaultStore,
        limiter: Option<RateLimiter>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let plugins = PluginRegistry::new(config.operator, bus.clone(), clock.clone());
        Ok(Self {
            inner: Arc::new(FlowExecutorInner {
                config,
                registry,
                vaults,
                limiter,
                plugins,
                fees: FeeLedger::new(),
                bus,
                clock,
                in_flight: DashMap::new(),
            }),
        })
    }

    // -- Administrative surface ---------------------------------------------

    pub fn register_trigger(
        &self,
        caller: AccountId,
        kind: TriggerKind,
        plugin: Arc<dyn Trigger>,
    ) -> Result<()> {
        self.inner.plugins.register_trigger(caller, kind, plugin)
    }

    pub fn unregister_trigger(&self, caller: AccountId, kind: TriggerKind) -> Result<()> {
        self.inner.plugins.unregister_trigger(caller, kind)
    }

    pub fn register_action(
        &self,
        caller: AccountId,
        kind: ActionKind,
        plugin: Arc<dyn Action>,
    ) -> Result<()> {
        self.inner.plugins.register_action(caller, kind, plugin)
    }

    pub fn unregister_action(&self, caller: AccountId, kind: ActionKind) -> Result<()> {
        self.inner.plugins.unregister_action(caller, kind)
    }

    pub fn is_trigger_registered(&self, kind: TriggerKind) -> bool {
        self.inner.plugins.is_trigger_registered(kind)
    }

    pub fn is_action_registered(&self, kind: ActionKind) -> bool {
        self.inner.plugins.is_action_registered(kind)
    }

    /// Accrued fee balance for an account.
    pub fn fee_balance(&self, account: AccountId) -> Amount {
        self.inner.fees.balance(account)
    }

    /// Drain an account's accrued fees.
    pub fn claim_fees(&self, account: AccountId) -> Amount {
        self.inner.fees.take(account)
    }

    // -- Execution -----------------------------------------------------------

    /// Attempt to execute a flow on behalf of `executor`.
    ///
    /// See the module docs for the step ordering and failure tiers.
    pub async fn execute_flow(
        &self,
        executor: AccountId,
        flow_id: FlowId,
    ) -> Result<ExecutionOutcome> {
        // Step 1: resolve the flow (hard failures).
        let flow = self.inner.registry.get_flow(flow_id)?;
        if !flow.active {
            return Err(RegistryError::FlowInactive { flow_id }.into());
        }

        let _guard = InFlightGuard::acquire(&self.inner.in_flight, flow_id)?;

        let attempt_id = Uuid::now_v7();
        tracing::info!(
            flow_id = %flow_id,
            executor = %executor,
            attempt_id = %attempt_id,
            "execution attempt started"
        );

        // Steps 2-6: eligibility.
        if let Some(reason) = self.check_eligibility(&flow, true).await? {
            return Ok(self.skip(attempt_id, flow_id, executor, reason));
        }

        // Step 7: resolve every action before invoking any of them.
        let planned = plan_actions(&flow);
        let mut resolved = Vec::with_capacity(planned.len());
        for spec in &planned {
            match self.inner.plugins.resolve_action(spec.kind) {
                Some(plugin) => resolved.push(plugin),
                None if self.inner.config.strict_action_resolution => {
                    return Err(EngineError::ActionNotRegistered { kind: spec.kind });
                }
                None => {
                    let reason = SkipReason::ActionNotRegistered { kind: spec.kind };
                    return Ok(self.skip(attempt_id, flow_id, executor, reason));
                }
            }
        }

        // Step 8: run the actions.  A fault converts the attempt into a
        // soft failure; effects committed by earlier actions stand.
        for (index, (spec, plugin)) in planned.iter().zip(resolved).enumerate() {
            if let Err(reason) = invoke_action(plugin.as_ref(), flow.owner, &spec.data).await {
                tracing::warn!(
                    flow_id = %flow_id,
                    action_index = index,
                    reason = %reason,
                    "action plugin failed"
                );
                let reason = SkipReason::ActionFailed { index, reason };
                return Ok(self.skip(attempt_id, flow_id, executor, reason));
            }
        }

        // Step 9: record-then-pay.
        self.inner.registry.record_execution(flow_id)?;
        if self.inner.config.enforce_rate_limit {
            if let Some(limiter) = &self.inner.limiter {
                limiter.record_execution(flow.owner, flow_id)?;
            }
        }
        let fee = self.collect_fee(&flow, executor)?;

        tracing::info!(flow_id = %flow_id, attempt_id = %attempt_id, "execution succeeded");
        self.inner.bus.publish(FlowEvent::ExecutionAttempted {
            attempt_id,
            flow_id,
            executor,
            success: true,
            reason: None,
            timestamp: self.inner.clock.now(),
        });

        Ok(ExecutionOutcome::Executed { attempt_id, fee })
    }

    /// Read-only eligibility probe over steps 1-6.
    ///
    /// Never mutates registry, vault, rate-limiter, or ledger state and
    /// never invokes actions; callers poll it before spending resources on
    /// a real attempt.  Conditions that would hard-fail `execute_flow`
    /// (missing or inactive flow, unregistered trigger) are reported as an
    /// ineligible probe rather than an error.
    pub async fn can_execute_flow(&self, flow_id: FlowId) -> EligibilityProbe {
        let flow = match self.inner.registry.get_flow(flow_id) {
            Ok(flow) => flow,
            Err(err) => return EligibilityProbe::blocked(err.to_string()),
        };
        if !flow.active {
            return EligibilityProbe::blocked(
                RegistryError::FlowInactive { flow_id }.to_string(),
            );
        }

        match self.check_eligibility(&flow, false).await {
            Ok(None) => EligibilityProbe::eligible(),
            Ok(Some(reason)) => EligibilityProbe::blocked(reason.to_string()),
            Err(err) => EligibilityProbe::blocked(err.to_string()),
        }
    }

    // -- Internals -----------------------------------------------------------

    /// Steps 2-6.  `Ok(None)` means eligible; `Ok(Some(reason))` is a soft
    /// stop; `Err` is a hard stop.  `publish_events` is false on the
    /// read-only probe path.
    async fn check_eligibility(
        &self,
        flow: &Flow,
        publish_events: bool,
    ) -> Result<Option<SkipReason>> {
        // Step 2: vault pause switch.
        if self.inner.vaults.is_paused(flow.owner)? {
            return Ok(Some(SkipReason::VaultPaused));
        }

        // Step 3: trigger resolution (hard).
        let trigger = self
            .inner
            .plugins
            .resolve_trigger(flow.trigger_kind)
            .ok_or(EngineError::TriggerNotRegistered {
                kind: flow.trigger_kind,
            })?;

        // Step 4: trigger evaluation.
        match invoke_trigger(trigger.as_ref(), flow.id, &flow.trigger_data).await {
            Ok(true) => {}
            Ok(false) => return Ok(Some(SkipReason::TriggerNotMet)),
            Err(reason) => return Ok(Some(SkipReason::TriggerFault { reason })),
        }

        // Step 5: optional balance condition, read directly off the vault.
        if let Some(data) = &flow.condition_data {
            if !data.is_null() {
                let condition = BalanceCondition::decode(data)?;
                let balance = self.inner.vaults.balance_of(flow.owner, condition.asset())?;
                if balance < condition.min_balance {
                    return Ok(Some(SkipReason::ConditionNotMet));
                }
            }
        }

        // Step 6: rate limit, where the deployment wires one in.
        if self.inner.config.enforce_rate_limit {
            if let Some(limiter) = &self.inner.limiter {
                if !limiter.can_execute(flow.owner, flow.id) {
                    if publish_events {
                        self.inner.bus.publish(FlowEvent::RateLimitExceeded {
                            account: flow.owner,
                            flow_id: flow.id,
                            timestamp: self.inner.clock.now(),
                        });
                    }
                    return Ok(Some(SkipReason::RateLimited));
                }
            }
        }

        Ok(None)
    }

    /// Debit the fee from the vault and split it between treasury and
    /// executor.  A zero configured fee is a no-op.
    fn collect_fee(&self, flow: &Flow, executor: AccountId) -> Result<FeeSplit> {
        let fee = self.inner.config.execution_fee;
        if fee == 0 {
            return Ok(FeeSplit::ZERO);
        }

        self.inner
            .vaults
            .debit(
                flow.owner,
                self.inner.config.operator,
                self.inner.config.fee_asset,
                fee,
            )
            .map_err(|e| EngineError::FeeTransferFailed {
                reason: e.to_string(),
            })?;

        let split = split_fee(fee, self.inner.config.protocol_fee_bps);
        self.inner.fees.credit(self.inner.config.treasury, split.protocol);
        self.inner.fees.credit(executor, split.executor);

        tracing::info!(
            flow_id = %flow.id,
            executor = %executor,
            executor_amount = split.executor,
            protocol_amount = split.protocol,
            "fee distributed"
        );
        self.inner.bus.publish(FlowEvent::FeeDistributed {
            flow_id: flow.id,
            executor,
            executor_amount: split.executor,
            protocol_amount: split.protocol,
            timestamp: self.inner.clock.now(),
        });

        Ok(split)
    }

    fn skip(
        &self,
        attempt_id: Uuid,
        flow_id: FlowId,
        executor: AccountId,
        reason: SkipReason,
    ) -> ExecutionOutcome {
        let text = reason.to_string();
        tracing::info!(flow_id = %flow_id, reason = %text, "execution skipped");
        self.inner.bus.publish(FlowEvent::ExecutionAttempted {
            attempt_id,
            flow_id,
            executor,
            success: false,
            reason: Some(text),
            timestamp: self.inner.clock.now(),
        });
        ExecutionOutcome::Skipped { attempt_id, reason }
    }
}

/// The declared action list, plus the auto-inserted cross-domain relay
/// when the flow targets another domain.
fn plan_actions(flow: &Flow) -> Vec<ActionSpec> {
    let mut planned = flow.actions.clone();
    if let Some(domain) = flow.destination_domain {
        planned.push(ActionSpec::new(
            ActionKind::RELAY,
            json!({ "domain": domain.0, "flow": flow.id.0 }),
        ));
    }
    planned
}

// ---------------------------------------------------------------------------
// Untrusted call boundary
// ---------------------------------------------------------------------------

/// Invoke a trigger plugin, normalizing every fault into a reason string.
async fn invoke_trigger(
    trigger: &dyn Trigger,
    flow_id: FlowId,
    data: &Value,
) -> std::result::Result<bool, String> {
    match AssertUnwindSafe(trigger.is_met(flow_id, data)).catch_unwind().await {
        Ok(Ok(met)) => Ok(met),
        Ok(Err(fault)) => Err(fault.reason),
        Err(_) => Err(UNKNOWN_ERROR.to_string()),
    }
}

/// Invoke an action plugin, normalizing every fault into a reason string.
async fn invoke_action(
    action: &dyn Action,
    vault: AccountId,
    data: &Value,
) -> std::result::Result<(), String> {
    match AssertUnwindSafe(action.execute(vault, data)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(fault)) => Err(fault.reason),
        Err(_) => Err(UNKNOWN_ERROR.to_string()),
    }
}

// ---------------------------------------------------------------------------
// In-flight guard
// ---------------------------------------------------------------------------

/// RAII marker rejecting re-entrant attempts on the same flow.
struct InFlightGuard<'a> {
    map: &'a DashMap<FlowId, ()>,
    flow_id: FlowId,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(map: &'a DashMap<FlowId, ()>, flow_id: FlowId) -> Result<Self> {
        match map.entry(flow_id) {
            Entry::Occupied(_) => Err(EngineError::ReentrantExecution { flow_id }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self { map, flow_id })
            }
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.flow_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
