//! Error types for remote calls and reconciliation outcomes.

use std::fmt;
use std::time::Duration;

/// Structured error returned by the vendor API client.
///
/// `code` is the machine-readable error code (e.g. `ResourceInUse.ActivityInProgress`);
/// the classification table keys off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(id) = &self.request_id {
            write!(f, " (request id {})", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

/// Why a single attempt did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// The vendor API returned an error.
    Remote(RemoteError),
    /// The resource reported a status that is not (yet) the desired one.
    Status {
        status: String,
        message: Option<String>,
    },
    /// The resource does not exist (per the absent-code table).
    Missing(RemoteError),
}

impl Cause {
    pub fn status(status: impl Into<String>) -> Self {
        Cause::Status {
            status: status.into(),
            message: None,
        }
    }

    /// The vendor error behind this cause, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Cause::Remote(e) | Cause::Missing(e) => Some(e),
            Cause::Status { .. } => None,
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Remote(e) => write!(f, "{}", e),
            Cause::Status {
                status,
                message: Some(msg),
            } => write!(f, "status {}: {}", status, msg),
            Cause::Status {
                status,
                message: None,
            } => write!(f, "status {}", status),
            Cause::Missing(e) => write!(f, "not found: {}", e),
        }
    }
}

/// Outcome of one failed attempt, as seen by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedError {
    /// Try again after backoff.
    Retryable(Cause),
    /// Stop immediately; no further attempts.
    Fatal(Cause),
}

impl ClassifiedError {
    pub fn cause(&self) -> &Cause {
        match self {
            ClassifiedError::Retryable(c) | ClassifiedError::Fatal(c) => c,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifiedError::Retryable(_))
    }
}

/// Error surfaced to the call site once the retry loop stops.
///
/// Transient failures never appear here on their own: they are absorbed by
/// the loop and only surface as the `last` cause of [`ReconcileError::TimedOut`].
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("{source} (after {attempts} attempt(s), {elapsed:.1?})")]
    Remote {
        source: RemoteError,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("resource does not exist: {source} (after {attempts} attempt(s), {elapsed:.1?})")]
    NotFound {
        source: RemoteError,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("resource reached failed state {status}{} (after {attempts} attempt(s), {elapsed:.1?})", fmt_message(.message))]
    TerminalFailure {
        status: String,
        message: Option<String>,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("timed out after {attempts} attempt(s), {elapsed:.1?}; last error: {last}")]
    TimedOut {
        last: Cause,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("cancelled after {attempts} attempt(s), {elapsed:.1?}")]
    Cancelled { attempts: u32, elapsed: Duration },
}

fn fmt_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl ReconcileError {
    /// Build the error for a fatal cause observed on attempt `attempts`.
    pub(crate) fn fatal(cause: Cause, attempts: u32, elapsed: Duration) -> Self {
        match cause {
            Cause::Remote(source) => ReconcileError::Remote {
                source,
                attempts,
                elapsed,
            },
            Cause::Missing(source) => ReconcileError::NotFound {
                source,
                attempts,
                elapsed,
            },
            Cause::Status { status, message } => ReconcileError::TerminalFailure {
                status,
                message,
                attempts,
                elapsed,
            },
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ReconcileError::Remote { attempts, .. }
            | ReconcileError::NotFound { attempts, .. }
            | ReconcileError::TerminalFailure { attempts, .. }
            | ReconcileError::TimedOut { attempts, .. }
            | ReconcileError::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ReconcileError::Remote { elapsed, .. }
            | ReconcileError::NotFound { elapsed, .. }
            | ReconcileError::TerminalFailure { elapsed, .. }
            | ReconcileError::TimedOut { elapsed, .. }
            | ReconcileError::Cancelled { elapsed, .. } => *elapsed,
        }
    }

    /// The underlying vendor error, including the last one seen before a timeout.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ReconcileError::Remote { source, .. } | ReconcileError::NotFound { source, .. } => {
                Some(source)
            }
            ReconcileError::TimedOut { last, .. } => last.remote(),
            ReconcileError::TerminalFailure { .. } | ReconcileError::Cancelled { .. } => None,
        }
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, ReconcileError::TimedOut { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Cancelled { .. })
    }
}
