//! JSON scenario format for rehearsing retry policies.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which call pattern a scenario exercises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    MutateThenPoll,
    DeleteThenPoll,
    Read,
    Write,
    Delete,
}

impl Mode {
    pub fn polls(self) -> bool {
        matches!(self, Mode::MutateThenPoll | Mode::DeleteThenPoll)
    }
}

/// One scripted vendor response.
///
/// JSON: `"ok"`, `{"error": "ResourceInUse"}` or `{"status": "CREATING"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Ok,
    Error(String),
    Status(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub mode: Mode,
    /// Action name of the first call (e.g. `CreateFunction`).
    pub action: String,
    /// Action name of the status poll; defaults to `action`.
    #[serde(default)]
    pub poll_action: Option<String>,
    #[serde(default = "default_idempotent")]
    pub idempotent: bool,
    #[serde(default)]
    pub issue: Vec<Step>,
    #[serde(default)]
    pub poll: Vec<Step>,
    #[serde(default)]
    pub pending: Vec<String>,
    #[serde(default)]
    pub ready: Vec<String>,
    /// Overrides every policy's time budget when set.
    #[serde(default)]
    pub max_elapsed_secs: Option<f64>,
}

fn default_idempotent() -> bool {
    true
}

impl Scenario {
    pub fn poll_action(&self) -> &str {
        self.poll_action.as_deref().unwrap_or(&self.action)
    }
}

pub fn parse_scenario(json: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_json::from_str(json).context("parse scenario JSON")?;
    validate(&scenario)?;
    Ok(scenario)
}

/// Read and validate a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse scenario JSON: {}", path.display()))?;
    validate(&scenario).with_context(|| format!("invalid scenario: {}", path.display()))?;
    Ok(scenario)
}

fn validate(s: &Scenario) -> Result<()> {
    if s.action.trim().is_empty() {
        anyhow::bail!("scenario action must not be empty");
    }
    if let Some(secs) = s.max_elapsed_secs {
        if !secs.is_finite() || secs < 0.0 {
            anyhow::bail!("max_elapsed_secs must be a non-negative number, got {secs}");
        }
    }
    if !s.mode.polls() && !s.poll.is_empty() {
        tracing::warn!(mode = ?s.mode, "scenario poll steps ignored for direct-retry mode");
    }
    Ok(())
}
