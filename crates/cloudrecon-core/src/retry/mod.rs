//! Retry and backoff.
//!
//! This module holds the bounded-time exponential backoff loop, the vendor
//! error-code classification table, and the status mapping used by pollers,
//! so every call site shares one consistent policy.

mod classify;
mod error;
mod operation;
mod policy;
mod run;
mod status;

pub use classify::{CodeClass, ErrorTable, Verdict};
pub use error::{Cause, ClassifiedError, ReconcileError, RemoteError};
pub use operation::Operation;
pub use policy::{secs_to_duration, RetryDecision, RetryPolicy, MAX_DURATION};
pub use run::{run_with_retry, Retrier};
pub use status::{PollResult, StatusClass, StatusTable};
