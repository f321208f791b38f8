use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use error_stack::{bail, Report, Result, ResultExt};
use thiserror::Error;

use crate::application::RefreshPolicy;
use crate::infrastructure::portal::DEFAULT_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "Config";
const ENV_PREFIX: &str = "PGE";
const ENV_SEPARATOR: &str = "__";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration")]
    ReadError,
    #[error("Configuration has an invalid shape")]
    DeserializeError,
    #[error("Portal username and password must be configured")]
    MissingCredentials,
    #[error("Refresh intervals must be at least one minute")]
    InvalidInterval,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub portal: PortalConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(serde::Deserialize, Clone)]
pub struct PortalConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_base_interval_minutes")]
    pub base_interval_minutes: u64,
    #[serde(default = "default_failure_interval_minutes")]
    pub failure_interval_minutes: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_base_interval_minutes() -> u64 {
    8 * 60
}

fn default_failure_interval_minutes() -> u64 {
    30
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            base_interval_minutes: default_base_interval_minutes(),
            failure_interval_minutes: default_failure_interval_minutes(),
        }
    }
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PortalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RefreshConfig {
    pub fn policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            base_interval: minutes(self.base_interval_minutes),
            failure_interval: minutes(self.failure_interval_minutes),
        }
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

impl AppConfig {
    /// Reads `path` (any format the `config` crate knows, optional) and then
    /// `PGE__SECTION__KEY` environment variables, which take precedence.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR));
        Self::from_builder(builder).attach_printable_lazy(|| format!("Config file: {}", path))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder
            .build()
            .change_context(ConfigError::ReadError)?
            .try_deserialize()
            .change_context(ConfigError::DeserializeError)?;

        if config.portal.username.trim().is_empty() || config.portal.password.is_empty() {
            bail!(ConfigError::MissingCredentials);
        }

        let refresh = &config.refresh;
        if refresh.base_interval_minutes == 0 || refresh.failure_interval_minutes == 0 {
            return Err(Report::new(ConfigError::InvalidInterval).attach_printable(format!(
                "base_interval_minutes = {}, failure_interval_minutes = {}",
                refresh.base_interval_minutes, refresh.failure_interval_minutes
            )));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_toml(
            r#"
[portal]
username = "jan"
password = "secret"
"#,
        )
        .unwrap();

        assert_eq!(config.portal.timeout(), Duration::from_secs(15));
        assert_eq!(config.portal.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            config.refresh.policy(),
            RefreshPolicy {
                base_interval: Duration::from_secs(8 * 60 * 60),
                failure_interval: Duration::from_secs(30 * 60),
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = from_toml(
            r#"
[portal]
username = "jan"
password = "secret"
timeout_secs = 30
base_url = "http://localhost:8080/ebok/"

[refresh]
base_interval_minutes = 60
failure_interval_minutes = 5
"#,
        )
        .unwrap();

        assert_eq!(config.portal.timeout(), Duration::from_secs(30));
        assert_eq!(config.portal.base_url, "http://localhost:8080/ebok/");
        assert_eq!(config.refresh.policy().failure_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_missing_credentials() {
        let error = from_toml(
            r#"
[portal]
username = "jan"
"#,
        )
        .unwrap_err();

        assert!(matches!(
            error.current_context(),
            ConfigError::MissingCredentials
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let error = from_toml(
            r#"
[portal]
username = "jan"
password = "secret"

[refresh]
failure_interval_minutes = 0
"#,
        )
        .unwrap_err();

        assert!(matches!(
            error.current_context(),
            ConfigError::InvalidInterval
        ));
    }

    #[test]
    fn test_huge_interval_saturates() {
        let refresh = RefreshConfig {
            base_interval_minutes: u64::MAX,
            failure_interval_minutes: 30,
        };

        assert_eq!(refresh.policy().base_interval, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_missing_portal_section() {
        let error = from_toml("").unwrap_err();

        assert!(matches!(
            error.current_context(),
            ConfigError::DeserializeError
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = from_toml(
            r#"
[portal]
username = "jan"
password = "secret"
"#,
        )
        .unwrap();

        assert!(!format!("{:?}", config).contains("secret"));
    }
}
