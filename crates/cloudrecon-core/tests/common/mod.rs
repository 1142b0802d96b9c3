#![allow(dead_code)]

pub mod fake_cloud;

use std::time::Duration;

use cloudrecon_core::{Policies, RetryPolicy};

/// Millisecond-scale budgets so timing tests finish quickly.
pub fn fast_policies(max_elapsed: Duration) -> Policies {
    Policies::uniform(RetryPolicy::new(
        max_elapsed,
        Duration::from_millis(2),
        Duration::from_millis(10),
        2.0,
        false,
    ))
}
