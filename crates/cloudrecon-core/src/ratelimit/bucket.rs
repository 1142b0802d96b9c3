//! Token-bucket limiter keyed by API action name.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::CallGate;
use crate::config::RateLimitConfig;
use crate::retry::MAX_DURATION;

/// Default calls per second per action when nothing is configured.
pub const DEFAULT_PER_SEC: f64 = 20.0;

/// Positive rates below this are raised to it (one call per ~17 minutes).
const MIN_PER_SEC: f64 = 1e-3;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    updated: Instant,
    rate: f64,
}

impl Bucket {
    fn new(rate: f64, now: Instant) -> Self {
        Self {
            tokens: rate,
            updated: now,
            rate,
        }
    }

    /// Take one token; a negative balance is a queue of callers already
    /// promised future slots.
    fn take(&mut self, now: Instant) -> Duration {
        let refill = now.saturating_duration_since(self.updated).as_secs_f64() * self.rate;
        self.tokens = (self.tokens + refill).min(self.rate);
        self.updated = now;
        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(-self.tokens / self.rate)
                .map_or(MAX_DURATION, |d| d.min(MAX_DURATION))
        }
    }
}

/// Per-action token buckets. Burst capacity equals the per-second rate.
///
/// A rate of zero or below disables limiting for that action.
#[derive(Debug)]
pub struct ActionRateLimiter {
    default_per_sec: f64,
    overrides: HashMap<String, f64>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Default for ActionRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_PER_SEC)
    }
}

impl ActionRateLimiter {
    pub fn new(default_per_sec: f64) -> Self {
        Self {
            default_per_sec,
            overrides: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        let mut limiter = Self::new(cfg.default_per_sec);
        for (action, rate) in &cfg.actions {
            limiter = limiter.with_action_limit(action.clone(), *rate);
        }
        limiter
    }

    pub fn with_action_limit(mut self, action: impl Into<String>, per_sec: f64) -> Self {
        self.overrides.insert(action.into(), per_sec);
        self
    }

    pub fn limit_for(&self, action: &str) -> f64 {
        self.overrides
            .get(action)
            .copied()
            .unwrap_or(self.default_per_sec)
    }

    fn reserve_at(&self, action: &str, now: Instant) -> Duration {
        let rate = self.limit_for(action);
        if !(rate.is_finite() && rate > 0.0) {
            return Duration::ZERO;
        }
        let rate = rate.max(MIN_PER_SEC);
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets
            .entry(action.to_string())
            .or_insert_with(|| Bucket::new(rate, now));
        let wait = bucket.take(now);
        if !wait.is_zero() {
            tracing::debug!(action, wait_ms = wait.as_millis() as u64, "rate limit reached");
        }
        wait
    }
}

impl CallGate for ActionRateLimiter {
    fn reserve(&self, action: &str) -> Duration {
        self.reserve_at(action, Instant::now())
    }
}
