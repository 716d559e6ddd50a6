//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fluxhub.toml` in the working directory, or at the path given by
//! `FLUXHUB_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use fluxhub_app::registry::RegistryOptions;
use fluxhub_domain::registry::RegistryPolicy;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Persistence hook settings.
    pub storage: StorageConfig,
    /// Device registry settings.
    pub registry: RegistryConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Interactive console settings.
    pub console: ConsoleConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Which persistence hook backs the devices.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// No persistence: state lives only in the device actors.
    None,
    /// Process-local map.
    #[default]
    Memory,
    /// `SQLite` database at [`StorageConfig::url`].
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unknown storage backend {other:?}"
            ))),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
    /// `SQLite` connection URL, used by the `sqlite` backend.
    pub url: String,
}

/// Device registry configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Lifecycle policy: `eager` or `on_demand`.
    pub policy: RegistryPolicy,
    /// Capacity of each device mailbox.
    pub mailbox_capacity: usize,
    /// Bound on a graceful device stop, in seconds.
    pub remove_timeout_secs: u64,
    /// Idle period after which on-demand devices deactivate, in seconds.
    pub idle_timeout_secs: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Interactive console configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Read shell commands from stdin.
    pub enabled: bool,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if an
    /// override or the resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FLUXHUB_CONFIG").unwrap_or_else(|_| "fluxhub.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("FLUXHUB_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("FLUXHUB_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Some(val) = var("FLUXHUB_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("FLUXHUB_STORAGE") {
            self.storage.backend = val.parse()?;
        }
        if let Some(val) = var("FLUXHUB_DATABASE_URL") {
            self.storage.url = val;
        }
        if let Some(val) = var("FLUXHUB_REGISTRY_POLICY") {
            self.registry.policy = val
                .parse()
                .map_err(|err: fluxhub_domain::error::ValidationError| {
                    ConfigError::Validation(err.to_string())
                })?;
        }
        if let Some(val) = var("FLUXHUB_CONSOLE") {
            self.console.enabled = matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(val) = var("FLUXHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.registry.mailbox_capacity == 0 {
            return Err(ConfigError::Validation(
                "mailbox capacity must be non-zero".to_string(),
            ));
        }
        if self.registry.remove_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remove timeout must be non-zero".to_string(),
            ));
        }
        if self.registry.idle_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "idle timeout must be non-zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Registry tuning derived from the `[registry]` section.
    #[must_use]
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            mailbox_capacity: self.registry.mailbox_capacity,
            stop_timeout: Duration::from_secs(self.registry.remove_timeout_secs),
            idle_timeout: self.registry.idle_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: "sqlite:fluxhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let options = RegistryOptions::default();
        Self {
            policy: RegistryPolicy::default(),
            mailbox_capacity: options.mailbox_capacity,
            remove_timeout_secs: options.stop_timeout.as_secs(),
            idle_timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fluxhubd=info,fluxhub_app=info,fluxhub_adapter_http_axum=info,tower_http=debug"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
