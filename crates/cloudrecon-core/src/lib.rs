pub mod config;
pub mod logging;

pub mod control;
pub mod ratelimit;
pub mod reconcile;
pub mod retry;
pub mod simulate;

pub use control::{CancelToken, OperationControl, ReconcileContext};
pub use reconcile::{Phase, Policies, Reconciler};
pub use retry::{
    Operation, PollResult, ReconcileError, RemoteError, RetryPolicy, StatusTable,
};
