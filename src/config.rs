//! Service configuration module.
//!
//! Handles loading, validating, and merging `omnishot.toml`. Stock defaults
//! are serialised to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [remote]
//! poll_interval_ms = 2000     # Delay before every status check
//! max_poll_attempts = 30      # Provider calls per job (submissions + polls)
//! task_timeout_secs = 90      # Hard cap on one remote job
//! request_timeout_secs = 30   # Per HTTP request
//!
//! [processing]
//! # max_workers = 4           # CPU workers (default: auto = CPU cores)
//!
//! [strategy]
//! standard_ai_platform_limit = 3
//!
//! [providers.relight]
//! base_url = "https://api.relight.example/v1"
//! api_key_env = "RELIGHT_API_KEY"
//! priority = 10
//! min_budget = "standard"     # lowest budget tier allowed to use it
//! enabled = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::BudgetTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "omnishot.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Remote job polling limits.
    pub remote: RemoteConfig,
    /// CPU worker pool settings.
    pub processing: ProcessingConfig,
    /// Tier selection thresholds.
    pub strategy: StrategyConfig,
    /// Remote enhancement providers keyed by id.
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "remote.poll_interval_ms must be positive".into(),
            ));
        }
        // The submission spends one attempt; at least one status check must remain.
        if self.remote.max_poll_attempts < 2 {
            return Err(ConfigError::Validation(
                "remote.max_poll_attempts must be at least 2".into(),
            ));
        }
        if self.remote.task_timeout_secs == 0 || self.remote.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote timeouts must be positive".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        for (id, provider) in &self.providers {
            if !(provider.base_url.starts_with("http://")
                || provider.base_url.starts_with("https://"))
            {
                return Err(ConfigError::Validation(format!(
                    "providers.{id}.base_url must be an http(s) URL"
                )));
            }
            if provider.api_key_env.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "providers.{id}.api_key_env must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Remote job polling limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub poll_interval_ms: u64,
    /// Provider calls allowed per job, submissions and status checks combined.
    pub max_poll_attempts: u32,
    pub task_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_poll_attempts: 30,
            task_timeout_secs: 90,
            request_timeout_secs: 30,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of CPU workers for pixel work.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Tier selection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    /// Largest batch the standard tier sends to a remote provider without a
    /// high-priority recommendation.
    pub standard_ai_platform_limit: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            standard_ai_platform_limit: 3,
        }
    }
}

/// One remote enhancement provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    /// Higher wins when several providers are eligible.
    #[serde(default)]
    pub priority: i32,
    /// Lowest budget tier allowed to use this provider.
    #[serde(default = "default_min_budget")]
    pub min_budget: BudgetTier,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_min_budget() -> BudgetTier {
    BudgetTier::Standard
}

fn default_enabled() -> bool {
    true
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the service config.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] in the
/// working directory is used if present, stock defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            Some(load_raw_config(p)?.ok_or_else(|| ConfigError::NotFound(p.to_path_buf()))?)
        }
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# OmniShot Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./omnishot.toml, or from the path given with --config.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Remote enhancement polling
# ---------------------------------------------------------------------------
[remote]
# Delay before every job status check, in milliseconds.
poll_interval_ms = 2000

# Provider calls allowed per job (submission retries and status checks).
max_poll_attempts = 30

# Hard cap on one remote job; the platform falls back to local processing.
task_timeout_secs = 90

# Timeout for each individual HTTP request.
request_timeout_secs = 30

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum CPU workers for decoding, resizing and encoding.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4

# ---------------------------------------------------------------------------
# Strategy
# ---------------------------------------------------------------------------
[strategy]
# The "standard" budget uses a remote provider for batches up to this many
# platforms, or for any batch whose analysis flags a high-priority fix.
standard_ai_platform_limit = 3

# ---------------------------------------------------------------------------
# Providers
# ---------------------------------------------------------------------------
# Each provider is registered only when enabled and its api_key_env variable
# is set. Higher priority wins; ties are broken by id.
#
# [providers.relight]
# base_url = "https://api.relight.example/v1"
# api_key_env = "RELIGHT_API_KEY"
# priority = 10
# min_budget = "standard"   # "standard" or "premium"
# enabled = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.remote.poll_interval_ms, 2000);
        assert_eq!(config.remote.max_poll_attempts, 30);
        assert_eq!(config.remote.task_timeout_secs, 90);
        assert_eq!(config.remote.request_timeout_secs, 30);
        assert_eq!(config.processing.max_workers, None);
        assert_eq!(config.strategy.standard_ai_platform_limit, 3);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[remote]
max_poll_attempts = 5
"#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.max_poll_attempts, 5);
        assert_eq!(config.remote.poll_interval_ms, 2000);
        assert_eq!(config.strategy.standard_ai_platform_limit, 3);
    }

    #[test]
    fn parse_provider_with_defaults() {
        let toml = r#"
[providers.relight]
base_url = "https://api.relight.example/v1"
api_key_env = "RELIGHT_API_KEY"
"#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        let provider = &config.providers["relight"];
        assert_eq!(provider.priority, 0);
        assert_eq!(provider.min_budget, BudgetTier::Standard);
        assert!(provider.enabled);
    }

    #[test]
    fn provider_requires_base_url() {
        let toml = r#"
[providers.relight]
api_key_env = "RELIGHT_API_KEY"
"#;
        assert!(toml::from_str::<ServiceConfig>(toml).is_err());
    }

    #[test]
    fn provider_min_budget_parses_tier_names() {
        let toml = r#"
[providers.studio]
base_url = "https://studio.example"
api_key_env = "STUDIO_KEY"
min_budget = "premium"
priority = 5
"#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.providers["studio"].min_budget, BudgetTier::Premium);
        assert_eq!(config.providers["studio"].priority, 5);
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig { max_workers: None };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_workers: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_workers: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"attempts = 30"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"attempts = 5"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("attempts").unwrap().as_integer(), Some(5));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[remote]
poll_interval_ms = 2000
max_poll_attempts = 30
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[remote]
max_poll_attempts = 10
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let remote = merged.get("remote").unwrap();
        assert_eq!(remote.get("poll_interval_ms").unwrap().as_integer(), Some(2000));
        assert_eq!(remote.get("max_poll_attempts").unwrap().as_integer(), Some(10));
    }

    #[test]
    fn merge_toml_adds_new_tables() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[providers.a]
base_url = "https://a.example"
api_key_env = "A_KEY"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        assert!(merged.get("providers").unwrap().get("a").is_some());
        assert!(merged.get("remote").is_some());
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[remote]
poll_interval = 100
"#;
        let err = toml::from_str::<ServiceConfig>(toml_str).unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(toml::from_str::<ServiceConfig>("[remotes]\nx = 1\n").is_err());
    }

    #[test]
    fn unknown_provider_key_rejected() {
        let toml_str = r#"
[providers.a]
base_url = "https://a.example"
api_key_env = "A_KEY"
api_key = "sk-oops"
"#;
        assert!(toml::from_str::<ServiceConfig>(toml_str).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_attempts() {
        let mut config = ServiceConfig::default();
        config.remote.max_poll_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_attempts_must_leave_room_for_a_status_check() {
        let mut config = ServiceConfig::default();
        config.remote.max_poll_attempts = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 2"));

        config.remote.max_poll_attempts = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_zero_interval() {
        let mut config = ServiceConfig::default();
        config.remote.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_workers() {
        let mut config = ServiceConfig::default();
        config.processing.max_workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_provider_url_scheme() {
        let mut config = ServiceConfig::default();
        config.providers.insert(
            "bad".into(),
            ProviderConfig {
                base_url: "ftp://nope".into(),
                api_key_env: "KEY".into(),
                priority: 0,
                min_budget: BudgetTier::Standard,
                enabled: true,
            },
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("providers.bad.base_url"));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_raw_config(&tmp.path().join("omnishot.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[remote]
poll_interval_ms = 250

[strategy]
standard_ai_platform_limit = 5
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.remote.poll_interval_ms, 250);
        assert_eq!(config.remote.max_poll_attempts, 30);
        assert_eq!(config.strategy.standard_ai_platform_limit, 5);
    }

    #[test]
    fn load_config_explicit_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "[remote\npoll_interval_ms = ").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("omnishot.toml");
        fs::write(&path, "[remote]\nmax_poll_attempts = 0\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value().unwrap(), None).unwrap();
        assert_eq!(config.remote.max_poll_attempts, 30);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ServiceConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.remote.poll_interval_ms, 2000);
        assert_eq!(config.remote.max_poll_attempts, 30);
        assert_eq!(config.remote.task_timeout_secs, 90);
        assert_eq!(config.strategy.standard_ai_platform_limit, 3);
        assert!(config.providers.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[remote]"));
        assert!(content.contains("[processing]"));
        assert!(content.contains("[strategy]"));
        assert!(content.contains("[providers.relight]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("remote").is_some());
        assert!(val.get("processing").is_some());
        assert!(val.get("strategy").is_some());
    }
}
