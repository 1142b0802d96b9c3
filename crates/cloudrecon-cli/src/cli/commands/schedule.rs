//! `cloudrecon schedule` – list the nominal backoff delays of a retry profile.

use anyhow::Result;
use cloudrecon_core::config::ReconConfig;
use cloudrecon_core::RetryPolicy;
use std::time::Duration;

use crate::cli::Profile;

/// `(retry number, delay, cumulative wait, within budget)` for the first `count` retries.
fn rows(policy: &RetryPolicy, count: usize) -> Vec<(usize, Duration, Duration, bool)> {
    let mut total = Duration::ZERO;
    policy
        .schedule(count)
        .into_iter()
        .enumerate()
        .map(|(i, delay)| {
            total += delay;
            (i + 1, delay, total, total <= policy.max_elapsed)
        })
        .collect()
}

pub fn run_schedule(cfg: &ReconConfig, profile: Profile, count: usize) -> Result<()> {
    let policies = cfg.policies();
    let policy = match profile {
        Profile::Read => policies.read,
        Profile::Write => policies.write,
        Profile::Poll => policies.poll,
    };

    println!(
        "profile {:?}: budget {:.1?}, initial {:.1?}, max {:.1?}, x{}, jitter {}",
        profile,
        policy.max_elapsed,
        policy.backoff_initial,
        policy.backoff_max,
        policy.backoff_multiplier,
        if policy.jitter { "on (50-100%)" } else { "off" }
    );
    println!("  {:>5}  {:>10}  {:>12}", "Retry", "Delay", "Cumulative");
    println!("  {}  {}  {}", "-----", "----------", "------------");
    for (n, delay, total, within) in rows(&policy, count) {
        println!(
            "  {:>5}  {:>10}  {:>12}{}",
            n,
            format!("{:.1?}", delay),
            format!("{:.1?}", total),
            if within { "" } else { "  (past budget)" }
        );
    }
    Ok(())
}
