use std::time::Duration;

/// Delay policy applied between failed consume calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay after the first failure
    pub base_delay: Duration,

    /// Upper bound on the delay
    pub max_delay: Duration,

    /// A call that ran at least this long before failing resets the count
    pub stable_after: Duration,

    /// Stop the runner after this many consecutive failures; `None` retries
    /// until cancellation
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            stable_after: Duration::from_secs(60),
            max_consecutive_failures: None,
        }
    }
}

impl RetryPolicy {
    /// Set the circuit breaker limit (builder pattern)
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = Some(max.max(1));
        self
    }

    /// Set base and cap of the exponential delay (builder pattern)
    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max.max(base);
        self
    }

    /// Delay before the next attempt after `failures` consecutive failures
    pub fn backoff_duration(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (failures - 1).min(16);
        self.base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }
}

/// Consecutive failure counter driven by a [`RetryPolicy`]
#[derive(Debug)]
pub(crate) struct Backoff {
    policy: RetryPolicy,
    failures: u32,
}

impl Backoff {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    pub(crate) fn reset(&mut self) {
        self.failures = 0;
    }

    /// Count a failure, returning the new consecutive total
    pub(crate) fn record_failure(&mut self, ran_for: Duration) -> u32 {
        if ran_for >= self.policy.stable_after {
            self.failures = 0;
        }
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.policy
            .max_consecutive_failures
            .is_some_and(|max| self.failures >= max)
    }

    pub(crate) fn delay(&self) -> Duration {
        self.policy.backoff_duration(self.failures)
    }
}
