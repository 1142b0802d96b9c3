//! Phases of a mutate-then-poll reconciliation.

use std::fmt;

use crate::retry::ReconcileError;

/// `Issuing -> Polling -> {Settled, Failed, TimedOut}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sending the mutating request (transient errors retry here).
    Issuing,
    /// Mutation accepted; observing remote status until it settles.
    Polling,
    Settled,
    Failed,
    TimedOut,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Settled | Phase::Failed | Phase::TimedOut)
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_advance_to(self, next: Phase) -> bool {
        match self {
            Phase::Issuing => matches!(
                next,
                Phase::Issuing | Phase::Polling | Phase::Failed | Phase::TimedOut
            ),
            Phase::Polling => matches!(
                next,
                Phase::Polling | Phase::Settled | Phase::Failed | Phase::TimedOut
            ),
            Phase::Settled | Phase::Failed | Phase::TimedOut => false,
        }
    }

    /// Terminal phase reached by a finished retry loop. Cancellation counts as failed.
    pub fn after<T>(result: &Result<T, ReconcileError>) -> Phase {
        match result {
            Ok(_) => Phase::Settled,
            Err(e) => Phase::after_error(e),
        }
    }

    pub fn after_error(err: &ReconcileError) -> Phase {
        match err {
            ReconcileError::TimedOut { .. } => Phase::TimedOut,
            _ => Phase::Failed,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Issuing => "issuing",
            Phase::Polling => "polling",
            Phase::Settled => "settled",
            Phase::Failed => "failed",
            Phase::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}

/// Current phase of one reconciliation, logging every transition.
#[derive(Debug)]
pub(crate) struct PhaseTracker<'a> {
    action: &'a str,
    phase: Phase,
}

impl<'a> PhaseTracker<'a> {
    pub(crate) fn start(action: &'a str) -> Self {
        tracing::debug!(action, phase = %Phase::Issuing, "reconcile started");
        Self {
            action,
            phase: Phase::Issuing,
        }
    }

    pub(crate) fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(action = self.action, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    pub(crate) fn finish<T>(&mut self, result: &Result<T, ReconcileError>) {
        self.advance(Phase::after(result));
    }

    pub(crate) fn fail(&mut self, err: &ReconcileError) {
        self.advance(Phase::after_error(err));
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }
}
