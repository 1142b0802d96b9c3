//! Retry loop: run a closure until success, a fatal error, cancellation or timeout.

use std::time::{Duration, Instant};

use super::error::{ClassifiedError, ReconcileError};
use super::policy::{RetryDecision, RetryPolicy, MAX_DURATION};
use crate::control::ReconcileContext;
use crate::ratelimit::{CallGate, Unlimited};

/// Runs `f` under `policy` with no call gate. See [`Retrier::run`].
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    ctx: &ReconcileContext,
    f: F,
) -> Result<T, ReconcileError>
where
    F: FnMut() -> Result<T, ClassifiedError>,
{
    Retrier::new(policy, ctx, &Unlimited).run("", f)
}

/// One bounded-time retry loop bound to a policy, context and call gate.
pub struct Retrier<'a> {
    policy: &'a RetryPolicy,
    ctx: &'a ReconcileContext,
    gate: &'a dyn CallGate,
}

impl<'a> Retrier<'a> {
    pub fn new(policy: &'a RetryPolicy, ctx: &'a ReconcileContext, gate: &'a dyn CallGate) -> Self {
        Self { policy, ctx, gate }
    }

    /// Invoke `f` until it succeeds or the loop must stop.
    ///
    /// - `Ok(v)` returns `v`.
    /// - `Fatal` returns at once; no further attempts.
    /// - `Retryable` sleeps for the next backoff delay (clipped to the
    ///   remaining budget) and tries again, unless the budget is spent, in
    ///   which case the last cause is returned inside `TimedOut`.
    ///
    /// The budget ends at `max_elapsed` after the first attempt or at the
    /// context deadline, whichever comes first. At least one attempt is made
    /// unless the context is already cancelled. `action` keys the call gate,
    /// which is consulted before every attempt.
    pub fn run<T, F>(&self, action: &str, mut f: F) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Result<T, ClassifiedError>,
    {
        let start = Instant::now();
        let budget_end = self.budget_end(start);
        let mut attempts = 0u32;

        loop {
            if self.ctx.is_cancelled() {
                return Err(self.cancelled(action, attempts, start));
            }

            let wait = self.gate.reserve(action);
            if !wait.is_zero() && self.ctx.sleep(wait) {
                return Err(self.cancelled(action, attempts, start));
            }

            attempts += 1;
            let err = match f() {
                Ok(v) => {
                    tracing::debug!(
                        action,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "remote call succeeded"
                    );
                    return Ok(v);
                }
                Err(e) => e,
            };

            let cause = match err {
                ClassifiedError::Fatal(cause) => {
                    tracing::warn!(action, attempts, "fatal error, not retrying: {}", cause);
                    return Err(ReconcileError::fatal(cause, attempts, start.elapsed()));
                }
                ClassifiedError::Retryable(cause) => cause,
            };

            let now = Instant::now();
            let remaining = budget_end.saturating_duration_since(now);
            let decision = if remaining.is_zero() {
                RetryDecision::GiveUp
            } else {
                self.policy.decide(attempts, now.duration_since(start))
            };

            match decision {
                RetryDecision::GiveUp => {
                    let elapsed = start.elapsed();
                    tracing::warn!(
                        action,
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "retry budget exhausted: {}",
                        cause
                    );
                    return Err(ReconcileError::TimedOut {
                        last: cause,
                        attempts,
                        elapsed,
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    let delay = delay.min(remaining);
                    tracing::debug!(
                        action,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retrying: {}",
                        cause
                    );
                    if self.ctx.sleep(delay) {
                        return Err(self.cancelled(action, attempts, start));
                    }
                }
            }
        }
    }

    fn budget_end(&self, start: Instant) -> Instant {
        let by_policy = start
            .checked_add(self.policy.max_elapsed)
            .unwrap_or_else(|| start + MAX_DURATION);
        match self.ctx.deadline() {
            Some(deadline) => by_policy.min(deadline),
            None => by_policy,
        }
    }

    fn cancelled(&self, action: &str, attempts: u32, start: Instant) -> ReconcileError {
        let elapsed = start.elapsed();
        tracing::info!(action, attempts, "cancelled");
        ReconcileError::Cancelled { attempts, elapsed }
    }
}
