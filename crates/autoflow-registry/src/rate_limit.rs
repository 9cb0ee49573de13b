//! Execution-cadence rate limiter.
//!
//! Maps a configured executions-per-day limit to a minimum inter-execution
//! interval (`one day / limit`, integer seconds) and tracks the last
//! recorded execution per `(account, flow)` pair.  An account with no
//! configured limit has a zero interval and is never throttled; a flow
//! with no recorded execution is always eligible.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use autoflow_core::{AccountId, Clock, EventBus, FlowEvent, FlowId};

use crate::error::{RegistryError, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// Per-(account, flow) execution throttle.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    limits: DashMap<AccountId, u32>,
    last_execution: DashMap<(AccountId, FlowId), DateTime<Utc>>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                limits: DashMap::new(),
                last_execution: DashMap::new(),
                bus,
                clock,
            }),
        }
    }

    /// Configure the daily execution limit for an account.
    pub fn set_limit_per_day(&self, account: AccountId, limit: u32) -> Result<()> {
        if account.is_zero() {
            return Err(RegistryError::InvalidAccount);
        }
        if limit == 0 {
            return Err(RegistryError::InvalidLimit);
        }

        self.inner.limits.insert(account, limit);

        tracing::info!(account = %account, limit_per_day = limit, "rate limit configured");
        self.inner.bus.publish(FlowEvent::RateLimitConfigured {
            account,
            limit_per_day: limit,
            timestamp: self.inner.clock.now(),
        });

        Ok(())
    }

    /// The minimum interval between executions for an account; zero when no
    /// limit was ever configured.
    pub fn minimum_interval(&self, account: AccountId) -> Duration {
        match self.inner.limits.get(&account) {
            Some(limit) => Duration::seconds(SECONDS_PER_DAY / i64::from(*limit.value())),
            None => Duration::zero(),
        }
    }

    /// Whether an execution of `(account, flow_id)` is currently allowed.
    ///
    /// Pure read; never fails.  True when the pair has never executed or
    /// the minimum interval has elapsed since the last recorded execution.
    pub fn can_execute(&self, account: AccountId, flow_id: FlowId) -> bool {
        match self.inner.last_execution.get(&(account, flow_id)) {
            None => true,
            Some(last) => {
                let elapsed = self.inner.clock.now() - *last.value();
                elapsed >= self.minimum_interval(account)
            }
        }
    }

    /// Stamp an execution of `(account, flow_id)` at the current time.
    pub fn record_execution(&self, account: AccountId, flow_id: FlowId) -> Result<()> {
        if account.is_zero() {
            return Err(RegistryError::InvalidAccount);
        }
        let now = self.inner.clock.now();
        self.inner.last_execution.insert((account, flow_id), now);
        tracing::debug!(account = %account, flow_id = %flow_id, "execution stamped");
        Ok(())
    }

    /// The last recorded execution time, if any.
    pub fn last_execution_time(
        &self,
        account: AccountId,
        flow_id: FlowId,
    ) -> Option<DateTime<Utc>> {
        self.inner
            .last_execution
            .get(&(account, flow_id))
            .map(|entry| *entry.value())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::ManualClock;

    fn setup() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = RateLimiter::new(EventBus::new(64), clock.clone());
        (limiter, clock)
    }

    fn account() -> AccountId {
        AccountId::from_low_u64(1)
    }

    #[test]
    fn never_executed_is_always_eligible() {
        let (limiter, _clock) = setup();
        limiter.set_limit_per_day(account(), 1).unwrap();
        assert!(limiter.can_execute(account(), FlowId(1)));
        assert!(limiter.last_execution_time(account(), FlowId(1)).is_none());
    }

    #[test]
    fn two_per_day_means_a_twelve_hour_interval() {
        let (limiter, clock) = setup();
        limiter.set_limit_per_day(account(), 2).unwrap();
        assert_eq!(limiter.minimum_interval(account()), Duration::hours(12));

        assert!(limiter.can_execute(account(), FlowId(1)));
        limiter.record_execution(account(), FlowId(1)).unwrap();
        assert!(!limiter.can_execute(account(), FlowId(1)));

        clock.advance(Duration::hours(12) + Duration::seconds(1));
        assert!(limiter.can_execute(account(), FlowId(1)));
    }

    #[test]
    fn interval_boundary_is_inclusive() {
        let (limiter, clock) = setup();
        limiter.set_limit_per_day(account(), 24).unwrap();
        limiter.record_execution(account(), FlowId(7)).unwrap();

        clock.advance(Duration::hours(1) - Duration::seconds(1));
        assert!(!limiter.can_execute(account(), FlowId(7)));

        clock.advance(Duration::seconds(1));
        assert!(limiter.can_execute(account(), FlowId(7)));
    }

    #[test]
    fn unconfigured_account_is_never_throttled() {
        let (limiter, _clock) = setup();
        assert_eq!(limiter.minimum_interval(account()), Duration::zero());

        limiter.record_execution(account(), FlowId(1)).unwrap();
        assert!(limiter.can_execute(account(), FlowId(1)));
    }

    #[test]
    fn flows_are_throttled_independently() {
        let (limiter, _clock) = setup();
        limiter.set_limit_per_day(account(), 2).unwrap();

        limiter.record_execution(account(), FlowId(1)).unwrap();
        assert!(!limiter.can_execute(account(), FlowId(1)));
        assert!(limiter.can_execute(account(), FlowId(2)));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let (limiter, _clock) = setup();
        assert!(matches!(
            limiter.set_limit_per_day(AccountId::ZERO, 5),
            Err(RegistryError::InvalidAccount)
        ));
        assert!(matches!(
            limiter.set_limit_per_day(account(), 0),
            Err(RegistryError::InvalidLimit)
        ));
        assert!(matches!(
            limiter.record_execution(AccountId::ZERO, FlowId(1)),
            Err(RegistryError::InvalidAccount)
        ));
    }

    #[test]
    fn reconfiguring_shortens_the_interval() {
        let (limiter, clock) = setup();
        limiter.set_limit_per_day(account(), 1).unwrap();
        limiter.record_execution(account(), FlowId(1)).unwrap();

        clock.advance(Duration::hours(13));
        assert!(!limiter.can_execute(account(), FlowId(1)));

        // Raising the limit to 2/day shrinks the interval to 12h, which has
        // already elapsed.
        limiter.set_limit_per_day(account(), 2).unwrap();
        assert!(limiter.can_execute(account(), FlowId(1)));
    }
}
