//! Call-site facade over the retry loop.
//!
//! A `Reconciler` bundles the dependencies every CRUD handler needs (call
//! gate, error table, read/write/poll policies, per-call context) and offers
//! the two recurring patterns:
//!
//! - direct retry: [`Reconciler::read`], [`Reconciler::write`], [`Reconciler::delete`]
//! - mutate-then-poll: [`Reconciler::mutate_then_poll`], [`Reconciler::delete_then_poll`]
//!
//! Dependencies are injected, never looked up from process-wide globals, so
//! one process can run differently configured reconcilers side by side.

mod phase;

pub use phase::Phase;

use std::sync::Arc;

use phase::PhaseTracker;

use crate::config::ReconConfig;
use crate::control::ReconcileContext;
use crate::ratelimit::{ActionRateLimiter, CallGate, Unlimited};
use crate::retry::{
    ErrorTable, Operation, PollResult, ReconcileError, RemoteError, Retrier, RetryPolicy,
};

/// Retry budgets per kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policies {
    pub read: RetryPolicy,
    pub write: RetryPolicy,
    pub poll: RetryPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            read: RetryPolicy::read(),
            write: RetryPolicy::write(),
            poll: RetryPolicy::poll(),
        }
    }
}

impl Policies {
    /// Same policy for every kind of call (handy in tests and simulations).
    pub fn uniform(policy: RetryPolicy) -> Self {
        Self {
            read: policy,
            write: policy,
            poll: policy,
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    gate: Arc<dyn CallGate>,
    errors: Arc<ErrorTable>,
    policies: Policies,
    ctx: ReconcileContext,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Arc::new(Unlimited), Arc::new(ErrorTable::default()))
    }
}

impl Reconciler {
    pub fn new(gate: Arc<dyn CallGate>, errors: Arc<ErrorTable>) -> Self {
        Self {
            gate,
            errors,
            policies: Policies::default(),
            ctx: ReconcileContext::new(),
        }
    }

    /// Build from config: per-action rate limiter, extended error table, and
    /// the three retry budgets.
    pub fn from_config(cfg: &ReconConfig) -> Self {
        let gate: Arc<dyn CallGate> = Arc::new(ActionRateLimiter::from_config(&cfg.rate_limit));
        let errors = Arc::new(ErrorTable::from_config(&cfg.error_codes));
        Self::new(gate, errors).with_policies(cfg.policies())
    }

    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Clone bound to a per-call deadline/cancellation context.
    pub fn with_context(&self, ctx: ReconcileContext) -> Self {
        Self {
            ctx,
            ..self.clone()
        }
    }

    /// Clone that classifies with `errors`; gate, policies and context are shared.
    pub fn with_errors(&self, errors: Arc<ErrorTable>) -> Self {
        Self {
            errors,
            ..self.clone()
        }
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    pub fn errors(&self) -> &ErrorTable {
        &self.errors
    }

    pub fn context(&self) -> &ReconcileContext {
        &self.ctx
    }

    fn retrier<'a>(&'a self, policy: &'a RetryPolicy) -> Retrier<'a> {
        Retrier::new(policy, &self.ctx, self.gate.as_ref())
    }

    /// Direct-retry read. A not-found code stops at once with
    /// [`ReconcileError::NotFound`].
    pub fn read<T, F>(&self, op: &Operation, mut f: F) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Result<T, RemoteError>,
    {
        let errors = &self.errors;
        self.retrier(&self.policies.read)
            .run(&op.action, || f().map_err(|e| errors.for_read(op, e)))
    }

    /// Direct-retry create/update for calls that are synchronous on the vendor side.
    pub fn write<T, F>(&self, op: &Operation, mut f: F) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Result<T, RemoteError>,
    {
        let errors = &self.errors;
        self.retrier(&self.policies.write)
            .run(&op.action, || f().map_err(|e| errors.for_write(op, e)))
    }

    /// Direct-retry delete. A not-found code counts as already deleted.
    pub fn delete<F>(&self, op: &Operation, mut f: F) -> Result<(), ReconcileError>
    where
        F: FnMut() -> Result<(), RemoteError>,
    {
        let errors = &self.errors;
        self.retrier(&self.policies.write)
            .run(&op.action, || match f() {
                Ok(()) => Ok(()),
                Err(e) => errors.for_delete(op, e),
            })
    }

    /// Issue a mutation once (retrying transient errors), then poll its
    /// status until it settles.
    ///
    /// `poll` receives the issue result (typically the new resource id) and
    /// maps the observed status to a [`PollResult`], usually through a
    /// [`StatusTable`](crate::retry::StatusTable). A `Failed` status ends in
    /// [`ReconcileError::TerminalFailure`] even though the mutation itself
    /// succeeded. Not-found while polling is retried, since a new resource may
    /// not be visible yet.
    pub fn mutate_then_poll<A, T, I, P>(
        &self,
        issue_op: &Operation,
        issue: I,
        poll_op: &Operation,
        mut poll: P,
    ) -> Result<T, ReconcileError>
    where
        I: FnMut() -> Result<A, RemoteError>,
        P: FnMut(&A) -> Result<PollResult<T>, RemoteError>,
    {
        let mut tracker = PhaseTracker::start(&issue_op.action);
        let accepted = match self.write(issue_op, issue) {
            Ok(a) => a,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };
        tracker.advance(Phase::Polling);

        let errors = &self.errors;
        let result = self
            .retrier(&self.policies.poll)
            .run(&poll_op.action, || match poll(&accepted) {
                Ok(observed) => observed.into_attempt(),
                Err(e) => Err(errors.for_poll(poll_op, e)),
            });
        tracker.finish(&result);
        result
    }

    /// Delete, then poll until the resource is gone (or reaches the ready
    /// state the table defines for deletion). Not-found settles both phases.
    pub fn delete_then_poll<I, P>(
        &self,
        issue_op: &Operation,
        issue: I,
        poll_op: &Operation,
        mut poll: P,
    ) -> Result<(), ReconcileError>
    where
        I: FnMut() -> Result<(), RemoteError>,
        P: FnMut() -> Result<PollResult<()>, RemoteError>,
    {
        let mut tracker = PhaseTracker::start(&issue_op.action);
        if let Err(e) = self.delete(issue_op, issue) {
            tracker.fail(&e);
            return Err(e);
        }
        tracker.advance(Phase::Polling);

        let errors = &self.errors;
        let result = self
            .retrier(&self.policies.poll)
            .run(&poll_op.action, || match poll() {
                Ok(observed) => observed.into_attempt(),
                Err(e) if errors.is_absent(&e) => Ok(()),
                Err(e) => Err(errors.for_poll(poll_op, e)),
            });
        tracker.finish(&result);
        result
    }
}
