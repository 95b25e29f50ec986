//! Circuit breaker construction shared by every outbound call site.

use std::time::Duration;

use failsafe::{Config, StateMachine, backoff, failure_policy};

/// Breaker that opens after consecutive failures and probes again after a jittered wait.
pub type CircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// Parameters for a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Minimum time the breaker stays open before a half-open probe.
    pub reset_timeout: Duration,
}

impl BreakerSettings {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
        }
    }

    /// Builds a fresh breaker in the closed state.
    pub fn build(&self) -> CircuitBreaker {
        let backoff = backoff::equal_jittered(self.reset_timeout, self.reset_timeout * 2);
        let policy = failure_policy::consecutive_failures(self.failure_threshold.max(1), backoff);
        Config::new().failure_policy(policy).build()
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_breaker_is_closed() {
        let breaker = BreakerSettings::default().build();
        assert!(breaker.is_call_permitted());
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = BreakerSettings::new(2, Duration::from_secs(60)).build();

        breaker.on_error();
        assert!(breaker.is_call_permitted());

        breaker.on_error();
        assert!(!breaker.is_call_permitted());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = BreakerSettings::new(2, Duration::from_secs(60)).build();

        breaker.on_error();
        breaker.on_success();
        breaker.on_error();

        assert!(breaker.is_call_permitted());
    }
}
