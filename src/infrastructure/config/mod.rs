pub mod app_config;

pub use app_config::{AppConfig, ConfigError, PortalConfig, RefreshConfig, DEFAULT_CONFIG_FILE};
