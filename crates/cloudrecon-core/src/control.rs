//! Cancellation and deadlines for in-flight reconciliations.
//!
//! Each call site runs under a `ReconcileContext`. The context carries an
//! optional deadline and a cancel token; the retry loop checks the token
//! before every attempt and waits on it during backoff, so a cancel wakes the
//! loop immediately instead of after the remaining sleep.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Cloneable cancellation signal. All clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every thread sleeping on this token.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`. Returns `true` if the token was cancelled
    /// before or during the wait.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Per-call deadline and cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl ReconcileContext {
    /// No deadline, fresh cancel token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancellable sleep; `true` means the context was cancelled.
    pub fn sleep(&self, timeout: Duration) -> bool {
        self.cancel.sleep(timeout)
    }
}

/// Shared registry of operation id -> cancel token. A supervisor (e.g. the
/// hosting framework's graph walker on interrupt) can cancel in-flight calls
/// by id.
#[derive(Debug, Default)]
pub struct OperationControl {
    ops: RwLock<HashMap<String, CancelToken>>,
}

impl OperationControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running operation; returns a context bound to its cancel token.
    pub fn register(&self, id: impl Into<String>) -> ReconcileContext {
        let token = CancelToken::new();
        self.ops
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), token.clone());
        ReconcileContext::new().with_cancel(token)
    }

    /// Unregister an operation (call when it finishes, success or failure).
    pub fn unregister(&self, id: &str) {
        self.ops
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Request cancellation of one operation. Returns `false` if the id is unknown.
    pub fn request_cancel(&self, id: &str) -> bool {
        match self
            .ops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for token in self
            .ops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            token.cancel();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.ops.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
