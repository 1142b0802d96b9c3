//! `cloudrecon simulate <scenario.json>` – rehearse a reconciliation offline.

use anyhow::{Context, Result};
use cloudrecon_core::config::ReconConfig;
use cloudrecon_core::simulate::{self, SimulationReport};
use cloudrecon_core::Reconciler;
use std::path::Path;

fn print_report(report: &SimulationReport) {
    println!("{:<12} {:?}", "mode:", report.mode);
    println!("{:<12} {}", "issue calls:", report.issue_calls);
    if report.mode.polls() {
        println!("{:<12} {}", "poll calls:", report.poll_calls);
    }
    println!("{:<12} {:.1?}", "elapsed:", report.elapsed);
    println!("{:<12} {}", "phase:", report.phase());
    match &report.outcome {
        Ok(Some(status)) => println!("{:<12} ok ({})", "result:", status),
        Ok(None) => println!("{:<12} ok", "result:"),
        Err(e) => println!("{:<12} {}", "result:", e),
    }
}

pub async fn run_simulate(cfg: &ReconConfig, path: &Path) -> Result<()> {
    let scenario = simulate::load_scenario(path)?;
    let reconciler = Reconciler::from_config(cfg);
    let report = tokio::task::spawn_blocking(move || simulate::run_scenario(&scenario, &reconciler))
        .await
        .context("simulate task join")?;
    print_report(&report);
    match report.outcome {
        Ok(_) => Ok(()),
        Err(e) => Err(anyhow::Error::new(e).context("scenario did not settle")),
    }
}
