//! `cloudrecon config` – show where the config lives and what is in effect.

use anyhow::Result;
use cloudrecon_core::config::{self, ReconConfig};
use cloudrecon_core::RetryPolicy;

fn print_policy(name: &str, configured: bool, p: &RetryPolicy) {
    println!(
        "  {:<6} budget {:>8.1?}  initial {:>8.1?}  max {:>8.1?}  x{:<4} jitter {:<5} {}",
        name,
        p.max_elapsed,
        p.backoff_initial,
        p.backoff_max,
        p.backoff_multiplier,
        p.jitter,
        if configured { "(config)" } else { "(default)" }
    );
}

pub fn run_config(cfg: &ReconConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());

    let policies = cfg.policies();
    println!("retry budgets:");
    print_policy("read", cfg.read_retry.is_some(), &policies.read);
    print_policy("write", cfg.write_retry.is_some(), &policies.write);
    print_policy("poll", cfg.poll_retry.is_some(), &policies.poll);

    println!("rate limit:");
    if cfg.rate_limit.default_per_sec > 0.0 {
        println!("  default {}/s per action", cfg.rate_limit.default_per_sec);
    } else {
        println!("  default unlimited");
    }
    for (action, rate) in &cfg.rate_limit.actions {
        println!("  {:<32} {}/s", action, rate);
    }

    let codes = &cfg.error_codes;
    println!("extra error codes:");
    for (label, list) in [
        ("transient", &codes.transient),
        ("transport", &codes.transport),
        ("absent", &codes.absent),
        ("fatal", &codes.fatal),
    ] {
        if list.is_empty() {
            println!("  {:<10} -", label);
        } else {
            println!("  {:<10} {}", label, list.join(", "));
        }
    }
    Ok(())
}
