use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ratelimit::DEFAULT_PER_SEC;
use crate::reconcile::Policies;
use crate::retry::RetryPolicy;

/// Retry budget parameters (optional sections in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Give up after this many seconds since the first attempt.
    pub max_elapsed_secs: f64,
    /// First backoff delay in seconds (e.g. 0.1 = 100ms).
    pub backoff_initial_secs: f64,
    /// Upper bound on a single backoff delay in seconds.
    pub backoff_max_secs: f64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Randomise each delay between half and the full value.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetryPolicy::default())
    }
}

impl From<&RetryPolicy> for RetryConfig {
    fn from(p: &RetryPolicy) -> Self {
        Self {
            max_elapsed_secs: p.max_elapsed.as_secs_f64(),
            backoff_initial_secs: p.backoff_initial.as_secs_f64(),
            backoff_max_secs: p.backoff_max.as_secs_f64(),
            backoff_multiplier: p.backoff_multiplier,
            jitter: p.jitter,
        }
    }
}

/// Outbound call rate per API action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Calls per second for actions without an override (0 disables limiting).
    pub default_per_sec: f64,
    /// Per-action overrides, e.g. `DescribeInstances = 10`.
    #[serde(default)]
    pub actions: BTreeMap<String, f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_per_sec: DEFAULT_PER_SEC,
            actions: BTreeMap::new(),
        }
    }
}

/// Extra vendor error codes layered over the built-in classification table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorCodesConfig {
    #[serde(default)]
    pub transient: Vec<String>,
    #[serde(default)]
    pub transport: Vec<String>,
    #[serde(default)]
    pub absent: Vec<String>,
    #[serde(default)]
    pub fatal: Vec<String>,
}

/// Global configuration loaded from `~/.config/cloudrecon/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Budget for read/describe calls; built-in default (3 min) if missing.
    #[serde(default)]
    pub read_retry: Option<RetryConfig>,
    /// Budget for create/update/delete calls; built-in default (5 min) if missing.
    #[serde(default)]
    pub write_retry: Option<RetryConfig>,
    /// Budget for status polling after a mutation; built-in default (5 min) if missing.
    #[serde(default)]
    pub poll_retry: Option<RetryConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub error_codes: ErrorCodesConfig,
}

impl ReconConfig {
    /// Effective retry policies: configured sections over built-in defaults.
    pub fn policies(&self) -> Policies {
        let defaults = Policies::default();
        let pick = |cfg: &Option<RetryConfig>, fallback: RetryPolicy| {
            cfg.as_ref().map(RetryPolicy::from).unwrap_or(fallback)
        };
        Policies {
            read: pick(&self.read_retry, defaults.read),
            write: pick(&self.write_retry, defaults.write),
            poll: pick(&self.poll_retry, defaults.poll),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cloudrecon")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReconConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReconConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<ReconConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: ReconConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_values() {
        let cfg = ReconConfig::default();
        assert!(cfg.read_retry.is_none());
        assert_eq!(cfg.rate_limit.default_per_sec, 20.0);
        assert!(cfg.error_codes.transient.is_empty());
        let p = cfg.policies();
        assert_eq!(p.read.max_elapsed, Duration::from_secs(180));
        assert_eq!(p.write.max_elapsed, Duration::from_secs(300));
        assert_eq!(p.poll.max_elapsed, Duration::from_secs(300));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = ReconConfig::default();
        cfg.write_retry = Some(RetryConfig::default());
        cfg.rate_limit.actions.insert("RunInstances".into(), 2.0);
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ReconConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: ReconConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ReconConfig::default());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            [poll_retry]
            max_elapsed_secs = 30
            backoff_initial_secs = 1
            backoff_max_secs = 8
            backoff_multiplier = 2.0
            jitter = false

            [rate_limit]
            default_per_sec = 10

            [rate_limit.actions]
            DescribeAutoScalingGroups = 5

            [error_codes]
            transient = ["FailedOperation.ConcurrentOperation"]
            absent = ["InvalidParameterValue.GroupNotExist"]
        "#;
        let cfg: ReconConfig = toml::from_str(toml).unwrap();
        let p = cfg.policies();
        assert_eq!(p.poll.max_elapsed, Duration::from_secs(30));
        assert_eq!(
            p.poll.schedule(4),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
        assert!(!p.poll.jitter);
        // Untouched sections keep built-in budgets.
        assert_eq!(p.read.max_elapsed, Duration::from_secs(180));
        assert_eq!(cfg.rate_limit.default_per_sec, 10.0);
        assert_eq!(cfg.rate_limit.actions.get("DescribeAutoScalingGroups"), Some(&5.0));
        assert_eq!(cfg.error_codes.transient.len(), 1);
        assert!(cfg.error_codes.fatal.is_empty());
    }

    #[test]
    fn oversized_budget_in_file_saturates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [read_retry]
            max_elapsed_secs = 1e30
            backoff_initial_secs = 0.1
            backoff_max_secs = 10
            backoff_multiplier = 2.0
            jitter = true
            "#,
        )
        .unwrap();
        let cfg = load_from(&path).unwrap();
        let p = cfg.policies();
        assert_eq!(p.read.max_elapsed, crate::retry::MAX_DURATION);
        assert_eq!(p.write.max_elapsed, Duration::from_secs(300));
    }

    #[test]
    fn load_from_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "rate_limit = 3").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
