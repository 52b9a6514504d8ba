use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::ErrorCatalog;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ELAPSED};

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per sequence (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Minimum wait applied to upstream retry_after hints, in seconds.
    #[serde(default = "default_min_hint_delay_secs")]
    pub min_hint_delay_secs: u64,
    /// Jitter as a fraction of the backoff delay (0.2 = +/-20%).
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    /// Overall wall-clock budget per sequence in seconds (0 = no budget).
    #[serde(default = "default_max_elapsed_secs")]
    pub max_elapsed_secs: Option<u64>,
}

fn default_min_hint_delay_secs() -> u64 {
    1
}

fn default_jitter_ratio() -> f64 {
    0.2
}

fn default_max_elapsed_secs() -> Option<u64> {
    Some(DEFAULT_MAX_ELAPSED.as_secs())
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
            min_hint_delay_secs: default_min_hint_delay_secs(),
            jitter_ratio: default_jitter_ratio(),
            max_elapsed_secs: default_max_elapsed_secs(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        let base_delay = if self.base_delay_secs > 0.0 {
            Duration::try_from_secs_f64(self.base_delay_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(self.max_delay_secs),
            min_hint_delay: Duration::from_secs(self.min_hint_delay_secs),
            jitter_ratio: self.jitter_ratio.clamp(0.0, 1.0),
            max_elapsed: self
                .max_elapsed_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/tgretry/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TgRetryConfig {
    /// Optional external catalog (.json or .toml); if missing, the embedded one is used.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl TgRetryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tgretry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TgRetryConfig> {
    load_or_init_at(&config_path()?)
}

/// [`load_or_init`] against an explicit file instead of the XDG location.
pub fn load_or_init_at(path: &Path) -> Result<TgRetryConfig> {
    if !path.exists() {
        let default_cfg = TgRetryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: TgRetryConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Catalog selected by the config: the external file when `catalog_path` is
/// set, otherwise a copy of the embedded table.
pub fn load_catalog(cfg: &TgRetryConfig) -> Result<ErrorCatalog> {
    match &cfg.catalog_path {
        Some(path) => ErrorCatalog::load_from_path(path)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => Ok(ErrorCatalog::builtin().clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let cfg = TgRetryConfig::default();
        assert!(cfg.retry.is_none());
        assert!(cfg.catalog_path.is_none());
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn default_retry_config_matches_default_policy() {
        assert_eq!(RetryConfig::default().to_policy(), RetryPolicy::default());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = TgRetryConfig {
            retry: Some(RetryConfig::default()),
            catalog_path: Some(PathBuf::from("/etc/tgretry/catalog.json")),
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: TgRetryConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            [retry]
            max_attempts = 3
            base_delay_secs = 0.5
            max_delay_secs = 15
            max_elapsed_secs = 120
        "#;
        let cfg: TgRetryConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 3);
        assert!((retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.min_hint_delay_secs, 1);
        assert!((retry.jitter_ratio - 0.2).abs() < 1e-9);

        let policy = cfg.retry_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(15));
        assert_eq!(policy.max_elapsed, Some(Duration::from_secs(120)));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let retry = RetryConfig {
            max_attempts: 0,
            base_delay_secs: -1.0,
            jitter_ratio: 3.0,
            ..RetryConfig::default()
        };
        let policy = retry.to_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::ZERO);
        assert!((policy.jitter_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn load_catalog_prefers_external_file() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            f,
            "[CHAT_NOT_FOUND]\ncode = \"CHAT_NOT_FOUND\"\ndescription = \"Chat gone\"\nremediation = \"Drop the chat\""
        )
        .unwrap();
        let cfg = TgRetryConfig {
            retry: None,
            catalog_path: Some(f.path().to_path_buf()),
        };
        let catalog = load_catalog(&cfg).unwrap();
        // One entry plus UNKNOWN.
        assert_eq!(catalog.len(), 2);

        let builtin = load_catalog(&TgRetryConfig::default()).unwrap();
        assert_eq!(builtin.len(), ErrorCatalog::builtin().len());
    }

    #[test]
    fn huge_delays_saturate_instead_of_panicking() {
        let toml = r#"
            [retry]
            max_attempts = 3
            base_delay_secs = 1e30
            max_delay_secs = 15
            max_elapsed_secs = 9223372036854775807
        "#;
        let cfg: TgRetryConfig = toml::from_str(toml).unwrap();
        let policy = cfg.retry_policy();
        assert_eq!(policy.base_delay, Duration::MAX);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(15));
        assert_eq!(policy.max_elapsed, Some(Duration::from_secs(i64::MAX as u64)));

        let nan = RetryConfig {
            base_delay_secs: f64::NAN,
            ..RetryConfig::default()
        };
        assert_eq!(nan.to_policy().base_delay, Duration::ZERO);
    }

    #[test]
    fn zero_budget_disables_deadline() {
        let retry = RetryConfig {
            max_elapsed_secs: Some(0),
            ..RetryConfig::default()
        };
        assert_eq!(retry.to_policy().max_elapsed, None);

        let toml = "[retry]\nmax_attempts = 2\nbase_delay_secs = 1.0\nmax_delay_secs = 5\n";
        let cfg: TgRetryConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.retry_policy().max_elapsed, Some(DEFAULT_MAX_ELAPSED));
    }

    #[test]
    fn load_or_init_writes_defaults_then_reads_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tgretry").join("config.toml");

        let created = load_or_init_at(&path).unwrap();
        assert_eq!(created, TgRetryConfig::default());
        assert!(path.exists());

        let edited = "[retry]\nmax_attempts = 2\nbase_delay_secs = 0.1\nmax_delay_secs = 1\n";
        fs::write(&path, edited).unwrap();
        let edited = load_or_init_at(&path).unwrap();
        assert_eq!(edited.retry.unwrap().max_attempts, 2);

        fs::write(&path, "retry = 7").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
    }
}
