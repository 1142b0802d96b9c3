//! Outbound call gating.
//!
//! The retry loop asks a `CallGate` for a turn immediately before every
//! network attempt. The gate is injected by the caller; the default
//! implementation is a token bucket per API action name.

mod bucket;

pub use bucket::{ActionRateLimiter, DEFAULT_PER_SEC};

use std::time::Duration;

/// Gate consulted once before each remote attempt, keyed by action name.
pub trait CallGate: Send + Sync {
    /// Book a slot for `action` and return how long the caller must wait
    /// before using it. Never blocks.
    fn reserve(&self, action: &str) -> Duration;

    /// Book a slot and block until it is usable.
    fn check(&self, action: &str) {
        let wait = self.reserve(action);
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

/// Gate that never delays.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl CallGate for Unlimited {
    fn reserve(&self, _action: &str) -> Duration {
        Duration::ZERO
    }
}
