use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::jira::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://issues.apache.org/jira/rest/api/2";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            default_retry_after_secs: default_retry_after_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Default)]
pub struct AppConfigOverrides {
    pub base_url: Option<String>,
    pub max_retries: Option<u32>,
    pub backoff_factor: Option<f64>,
    pub logging_debug: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found at {path}")]
    MissingConfigFile { path: PathBuf },
    #[error("failed to read config file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse TOML config at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Loads the explicit config file if one is given, otherwise the per-user
/// config file when it exists, otherwise built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from(path);
    }

    let discovered = resolve_config_path_from_env(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    );
    match discovered {
        Some(path) if path.is_file() => load_from(&path),
        _ => {
            let cfg = AppConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let path = path.to_path_buf();
    let raw = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingConfigFile { path: path.clone() }
        } else {
            ConfigError::ReadFailed {
                path: path.clone(),
                source,
            }
        }
    })?;

    let cfg = toml::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::ParseFailed {
        path: path.clone(),
        source,
    })?;
    cfg.validate()?;
    Ok(cfg)
}

fn resolve_config_path_from_env(
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(dir) = xdg_config_home.filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(dir).join("jira-harvest").join("config.toml"));
    }

    let home = home.filter(|value| !value.is_empty())?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("jira-harvest")
            .join("config.toml"),
    )
}

impl AppConfig {
    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) -> Result<(), ConfigError> {
        if let Some(value) = &overrides.base_url {
            self.jira.base_url = value.clone();
        }
        if let Some(value) = overrides.max_retries {
            self.retry.max_retries = value;
        }
        if let Some(value) = overrides.backoff_factor {
            self.retry.backoff_factor = value;
        }
        if let Some(value) = overrides.logging_debug {
            self.logging.debug = value;
        }

        self.validate()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            backoff_factor: self.retry.backoff_factor,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.jira.timeout_secs)
    }

    pub fn default_retry_after(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry.default_retry_after_secs)
            .unwrap_or(Duration::from_secs(5))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jira.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "jira.base_url must not be empty".into(),
            ));
        }
        if self.jira.timeout_secs == 0 {
            return Err(ConfigError::Invalid("jira.timeout_secs must be > 0".into()));
        }
        if !(1..=100).contains(&self.jira.page_size) {
            return Err(ConfigError::Invalid(
                "jira.page_size must be between 1 and 100".into(),
            ));
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor <= 0.0 {
            return Err(ConfigError::Invalid(
                "retry.backoff_factor must be a finite number > 0".into(),
            ));
        }
        if Duration::try_from_secs_f64(self.retry.default_retry_after_secs).is_err() {
            return Err(ConfigError::Invalid(
                "retry.default_retry_after_secs must be a non-negative number of seconds within range".into(),
            ));
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_page_size() -> usize {
    100
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_backoff_factor() -> f64 {
    1.0
}

const fn default_retry_after_secs() -> f64 {
    5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_path_prefers_xdg_config_home() {
        let path = resolve_config_path_from_env(
            Some(OsString::from("/tmp/xdg-home")),
            Some(OsString::from("/tmp/home")),
        )
        .expect("xdg path should resolve");

        assert_eq!(
            path,
            PathBuf::from("/tmp/xdg-home/jira-harvest/config.toml")
        );
    }

    #[test]
    fn resolve_path_falls_back_to_home_dot_config() {
        let path = resolve_config_path_from_env(None, Some(OsString::from("/tmp/home")))
            .expect("home path should resolve");

        assert_eq!(
            path,
            PathBuf::from("/tmp/home/.config/jira-harvest/config.toml")
        );
    }

    #[test]
    fn resolve_path_is_none_without_home() {
        assert!(resolve_config_path_from_env(None, None).is_none());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("toml should parse");
        cfg.validate().expect("defaults should validate");

        assert_eq!(cfg.jira.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.jira.timeout_secs, 30);
        assert_eq!(cfg.jira.page_size, 100);
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.backoff_factor, 1.0);
        assert_eq!(cfg.default_retry_after(), Duration::from_secs(5));
        assert!(!cfg.logging.debug);
    }

    #[test]
    fn validates_rejects_out_of_range_page_size() {
        let raw = r#"
            [jira]
            page_size = 250
        "#;

        let cfg: AppConfig = toml::from_str(raw).expect("toml should parse");
        let err = cfg.validate().expect_err("page size should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validates_rejects_non_positive_values() {
        let raw = r#"
            [jira]
            timeout_secs = 0

            [retry]
            backoff_factor = 0.0
        "#;

        let cfg: AppConfig = toml::from_str(raw).expect("toml should parse");
        let err = cfg.validate().expect_err("invalid values should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validates_rejects_unrepresentable_retry_after() {
        for raw in [
            "[retry]\ndefault_retry_after_secs = 1e20",
            "[retry]\ndefault_retry_after_secs = -1.0",
            "[retry]\ndefault_retry_after_secs = nan",
        ] {
            let cfg: AppConfig = toml::from_str(raw).expect("toml should parse");
            let err = cfg.validate().expect_err("retry-after should fail");
            assert!(matches!(err, ConfigError::Invalid(_)), "{raw}");
            assert_eq!(cfg.default_retry_after(), Duration::from_secs(5));
        }
    }

    #[test]
    fn config_example_parses() {
        let raw = include_str!("../config.example.toml");
        let cfg: AppConfig = toml::from_str(raw).expect("example config should parse");
        cfg.validate().expect("example config should validate");
    }

    #[test]
    fn missing_explicit_file_is_reported() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let err = load(Some(&dir.path().join("nope.toml"))).expect_err("missing file");
        assert!(matches!(err, ConfigError::MissingConfigFile { .. }));
    }

    #[test]
    fn apply_overrides_updates_values() {
        let raw = include_str!("../config.example.toml");
        let mut cfg: AppConfig = toml::from_str(raw).expect("example config should parse");

        let overrides = AppConfigOverrides {
            base_url: Some("http://localhost:8080/rest/api/2".into()),
            max_retries: Some(0),
            backoff_factor: Some(0.25),
            logging_debug: Some(true),
        };

        cfg.apply_overrides(&overrides)
            .expect("overrides should validate");

        assert_eq!(cfg.jira.base_url, "http://localhost:8080/rest/api/2");
        assert_eq!(
            cfg.retry_policy(),
            RetryPolicy {
                max_retries: 0,
                backoff_factor: 0.25
            }
        );
        assert!(cfg.logging.debug);
    }

    #[test]
    fn apply_overrides_rejects_bad_backoff() {
        let mut cfg = AppConfig::default();
        let overrides = AppConfigOverrides {
            backoff_factor: Some(-1.0),
            ..AppConfigOverrides::default()
        };

        let err = cfg
            .apply_overrides(&overrides)
            .expect_err("negative backoff should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
