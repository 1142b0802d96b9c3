//! Map remote resource status strings onto poll results.

use std::collections::HashSet;

use super::error::{Cause, ClassifiedError};

/// What one status poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    /// Still transitioning (e.g. `CREATING`).
    Pending { status: String },
    /// Reached the desired state.
    Ready(T),
    /// Reached a failed end state (e.g. `CREATE_FAILED`).
    Failed {
        status: String,
        message: Option<String>,
    },
}

impl<T> PollResult<T> {
    /// Convert into the retry loop's vocabulary: pending retries, failed stops.
    pub fn into_attempt(self) -> Result<T, ClassifiedError> {
        match self {
            PollResult::Ready(v) => Ok(v),
            PollResult::Pending { status } => {
                Err(ClassifiedError::Retryable(Cause::status(status)))
            }
            PollResult::Failed { status, message } => {
                Err(ClassifiedError::Fatal(Cause::Status { status, message }))
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollResult<U> {
        match self {
            PollResult::Ready(v) => PollResult::Ready(f(v)),
            PollResult::Pending { status } => PollResult::Pending { status },
            PollResult::Failed { status, message } => PollResult::Failed { status, message },
        }
    }
}

/// Which bucket a status falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Ready,
    Failed,
}

/// Per-resource table of pending and ready statuses.
///
/// Anything not listed is treated as a failed end state, so an unexpected
/// status stops polling instead of spinning until the budget runs out.
/// Matching ignores ASCII case.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    pending: HashSet<String>,
    ready: HashSet<String>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pending
            .extend(statuses.into_iter().map(|s| s.as_ref().to_ascii_uppercase()));
        self
    }

    pub fn ready<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ready
            .extend(statuses.into_iter().map(|s| s.as_ref().to_ascii_uppercase()));
        self
    }

    pub fn class_of(&self, status: &str) -> StatusClass {
        let key = status.to_ascii_uppercase();
        if self.ready.contains(&key) {
            StatusClass::Ready
        } else if self.pending.contains(&key) {
            StatusClass::Pending
        } else {
            StatusClass::Failed
        }
    }

    pub fn observe<T>(&self, status: &str, value: T) -> PollResult<T> {
        self.observe_with_message(status, None, value)
    }

    pub fn observe_with_message<T>(
        &self,
        status: &str,
        message: Option<String>,
        value: T,
    ) -> PollResult<T> {
        match self.class_of(status) {
            StatusClass::Ready => PollResult::Ready(value),
            StatusClass::Pending => PollResult::Pending {
                status: status.to_string(),
            },
            StatusClass::Failed => PollResult::Failed {
                status: status.to_string(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_statuses() -> StatusTable {
        StatusTable::new()
            .pending(["Creating", "Updating"])
            .ready(["Active"])
    }

    #[test]
    fn classes_ignore_case() {
        let t = function_statuses();
        assert_eq!(t.class_of("CREATING"), StatusClass::Pending);
        assert_eq!(t.class_of("active"), StatusClass::Ready);
        assert_eq!(t.class_of("CreateFailed"), StatusClass::Failed);
    }

    #[test]
    fn observe_builds_poll_results() {
        let t = function_statuses();
        assert_eq!(t.observe("Active", 7), PollResult::Ready(7));
        assert_eq!(
            t.observe("Updating", 7),
            PollResult::Pending {
                status: "Updating".into()
            }
        );
        assert_eq!(
            t.observe_with_message("CreateFailed", Some("image missing".into()), 7),
            PollResult::Failed {
                status: "CreateFailed".into(),
                message: Some("image missing".into())
            }
        );
    }

    #[test]
    fn into_attempt_maps_to_retry_vocabulary() {
        assert_eq!(PollResult::Ready(1).into_attempt(), Ok(1));
        assert!(PollResult::<()>::Pending {
            status: "creating".into()
        }
        .into_attempt()
        .unwrap_err()
        .is_retryable());
        assert!(!PollResult::<()>::Failed {
            status: "failed".into(),
            message: None
        }
        .into_attempt()
        .unwrap_err()
        .is_retryable());
    }
}
