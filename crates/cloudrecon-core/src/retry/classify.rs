//! Classify vendor error codes into retry verdicts.
//!
//! The table is data, not code: call sites and config extend it with new
//! codes without touching the retry loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::{Cause, ClassifiedError, RemoteError};
use super::operation::Operation;
use crate::config::ErrorCodesConfig;

/// How a vendor error code behaves under retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeClass {
    /// Server-side transient condition (throttling, busy, internal error).
    Transient,
    /// Client-side network failure; the request may or may not have been applied.
    Transport,
    /// The target resource does not exist.
    Absent,
    /// Never retried.
    Fatal,
}

/// Verdict for one error against one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Retryable,
    Fatal,
    Absent,
}

const DEFAULT_TRANSIENT: &[&str] = &[
    "InternalError",
    "RequestLimitExceeded",
    "ResourceBusy",
    "ResourceInUse",
    "ResourceUnavailable",
    "ResourceInUse.ActivityInProgress",
];

const DEFAULT_TRANSPORT: &[&str] = &["ClientError.NetworkError", "ClientError.HttpStatusCodeError"];

const DEFAULT_ABSENT: &[&str] = &["ResourceNotFound", "InvalidInstanceId.NotFound"];

/// Mapping from vendor error code to [`CodeClass`].
///
/// Codes are dotted hierarchies. Lookup tries the exact code, then each parent
/// prefix (`A.B.C`, `A.B`, `A`), so registering `ResourceNotFound` covers
/// every `ResourceNotFound.*` sub-code. Unknown codes are fatal.
#[derive(Debug, Clone)]
pub struct ErrorTable {
    codes: HashMap<String, CodeClass>,
}

impl Default for ErrorTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (codes, class) in [
            (DEFAULT_TRANSIENT, CodeClass::Transient),
            (DEFAULT_TRANSPORT, CodeClass::Transport),
            (DEFAULT_ABSENT, CodeClass::Absent),
        ] {
            for code in codes {
                table.insert(*code, class);
            }
        }
        table
    }
}

impl ErrorTable {
    /// A table with no entries: everything is fatal.
    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// Default table extended with the codes from config.
    pub fn from_config(cfg: &ErrorCodesConfig) -> Self {
        let mut table = Self::default();
        table.extend(cfg);
        table
    }

    pub fn insert(&mut self, code: impl Into<String>, class: CodeClass) {
        self.codes.insert(code.into(), class);
    }

    pub fn with_code(mut self, code: impl Into<String>, class: CodeClass) -> Self {
        self.insert(code, class);
        self
    }

    pub fn extend(&mut self, cfg: &ErrorCodesConfig) {
        for (codes, class) in [
            (&cfg.transient, CodeClass::Transient),
            (&cfg.transport, CodeClass::Transport),
            (&cfg.absent, CodeClass::Absent),
            (&cfg.fatal, CodeClass::Fatal),
        ] {
            for code in codes {
                self.insert(code.clone(), class);
            }
        }
    }

    /// Class for `code`, walking up the dotted hierarchy. `None` if unknown.
    pub fn lookup(&self, code: &str) -> Option<CodeClass> {
        let mut key = code;
        loop {
            if let Some(class) = self.codes.get(key) {
                return Some(*class);
            }
            match key.rfind('.') {
                Some(idx) => key = &key[..idx],
                None => return None,
            }
        }
    }

    pub fn classify(&self, op: &Operation, err: &RemoteError) -> Verdict {
        match self.lookup(&err.code) {
            Some(CodeClass::Transient) => Verdict::Retryable,
            Some(CodeClass::Transport) if op.idempotent => Verdict::Retryable,
            Some(CodeClass::Transport) => Verdict::Fatal,
            Some(CodeClass::Absent) => Verdict::Absent,
            Some(CodeClass::Fatal) | None => Verdict::Fatal,
        }
    }

    pub fn is_absent(&self, err: &RemoteError) -> bool {
        self.lookup(&err.code) == Some(CodeClass::Absent)
    }

    /// Mutations: absence of a dependency is a plain fatal error.
    pub fn for_write(&self, op: &Operation, err: RemoteError) -> ClassifiedError {
        match self.classify(op, &err) {
            Verdict::Retryable => ClassifiedError::Retryable(Cause::Remote(err)),
            Verdict::Fatal | Verdict::Absent => ClassifiedError::Fatal(Cause::Remote(err)),
        }
    }

    /// Reads: absence stops the loop and surfaces as "does not exist".
    pub fn for_read(&self, op: &Operation, err: RemoteError) -> ClassifiedError {
        match self.classify(op, &err) {
            Verdict::Retryable => ClassifiedError::Retryable(Cause::Remote(err)),
            Verdict::Fatal => ClassifiedError::Fatal(Cause::Remote(err)),
            Verdict::Absent => ClassifiedError::Fatal(Cause::Missing(err)),
        }
    }

    /// Deletes: absence means the resource is already gone.
    pub fn for_delete(&self, op: &Operation, err: RemoteError) -> Result<(), ClassifiedError> {
        match self.classify(op, &err) {
            Verdict::Absent => Ok(()),
            Verdict::Retryable => Err(ClassifiedError::Retryable(Cause::Remote(err))),
            Verdict::Fatal => Err(ClassifiedError::Fatal(Cause::Remote(err))),
        }
    }

    /// Status polls: a resource that is not visible yet may still appear.
    pub fn for_poll(&self, op: &Operation, err: RemoteError) -> ClassifiedError {
        match self.classify(op, &err) {
            Verdict::Retryable => ClassifiedError::Retryable(Cause::Remote(err)),
            Verdict::Absent => ClassifiedError::Retryable(Cause::Missing(err)),
            Verdict::Fatal => ClassifiedError::Fatal(Cause::Remote(err)),
        }
    }
}
