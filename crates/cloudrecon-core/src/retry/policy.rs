use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Decision returned by the retry policy after a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget exhausted; stop and report a timeout.
    GiveUp,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded-time exponential backoff.
///
/// The loop keeps retrying until `max_elapsed` has passed since the first
/// attempt. Delays grow by `backoff_multiplier` from `backoff_initial` and are
/// capped at `backoff_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_elapsed: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::write()
    }
}

impl RetryPolicy {
    /// Create a policy, normalising nonsensical inputs (multiplier below 1,
    /// max delay below the initial delay).
    pub fn new(
        max_elapsed: Duration,
        backoff_initial: Duration,
        backoff_max: Duration,
        backoff_multiplier: f64,
        jitter: bool,
    ) -> Self {
        let backoff_multiplier = if backoff_multiplier.is_finite() && backoff_multiplier >= 1.0 {
            backoff_multiplier
        } else {
            1.0
        };
        Self {
            max_elapsed,
            backoff_initial,
            backoff_max: backoff_max.max(backoff_initial),
            backoff_multiplier,
            jitter,
        }
    }

    /// Budget for read/describe calls (3 minutes).
    pub fn read() -> Self {
        Self::new(
            Duration::from_secs(180),
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
            true,
        )
    }

    /// Budget for create/update/delete calls (5 minutes).
    pub fn write() -> Self {
        Self::new(
            Duration::from_secs(300),
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
            true,
        )
    }

    /// Budget for status polling after a mutation (5 minutes).
    pub fn poll() -> Self {
        Self::write()
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Nominal (un-jittered) delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.backoff_initial.as_secs_f64() * self.backoff_multiplier.powi(exp);
        let capped = raw.min(self.backoff_max.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::try_from_secs_f64(capped).unwrap_or(self.backoff_max)
        } else {
            self.backoff_max
        }
    }

    /// Decide what to do after attempt `attempt` (1-based) failed retryably,
    /// `elapsed` after the first attempt started.
    pub fn decide(&self, attempt: u32, elapsed: Duration) -> RetryDecision {
        if elapsed >= self.max_elapsed {
            return RetryDecision::GiveUp;
        }
        let delay = self.delay_for(attempt);
        let delay = if self.jitter { jittered(delay) } else { delay };
        RetryDecision::RetryAfter(delay)
    }

    /// The first `count` nominal delays, in order.
    pub fn schedule(&self, count: usize) -> Vec<Duration> {
        (1..=count as u32).map(|n| self.delay_for(n)).collect()
    }
}

/// Equal jitter: keep half the delay, randomise the other half.
fn jittered(delay: Duration) -> Duration {
    let half = delay / 2;
    let spread = delay.saturating_sub(half);
    if spread.is_zero() {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0.0..=1.0) * spread.as_secs_f64();
    half + Duration::try_from_secs_f64(extra).map_or(spread, |d| d.min(spread))
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(
            secs_to_duration(cfg.max_elapsed_secs),
            secs_to_duration(cfg.backoff_initial_secs),
            secs_to_duration(cfg.backoff_max_secs),
            cfg.backoff_multiplier,
            cfg.jitter,
        )
    }
}

/// Longest duration taken from config or scenario input (one year).
pub const MAX_DURATION: Duration = Duration::from_secs(86_400 * 365);

/// Seconds from user input. Zero, negative and NaN give zero; anything
/// above [`MAX_DURATION`] (including infinity) saturates there.
pub fn secs_to_duration(v: f64) -> Duration {
    if !(v > 0.0) {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(v).map_or(MAX_DURATION, |d| d.min(MAX_DURATION))
}
