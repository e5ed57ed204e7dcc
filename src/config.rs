//! Configuration management for session-keeper.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::session::{ManagerConfig, TransportMode};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session configuration.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop on Ctrl-C instead of being killed mid-request.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Cookie / query parameter name carrying the session id.
    pub identifier_name: String,
    /// Idle lifetime in seconds.
    pub max_lifetime_secs: i64,
    /// Transport mode name: `query` or `cookie`.
    pub transport: String,
    /// Reaper cadence in seconds. Unset means a quarter of the lifetime.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = ManagerConfig::default();
        Self {
            identifier_name: defaults.identifier_name,
            max_lifetime_secs: defaults.max_lifetime_secs,
            transport: defaults.transport.to_string(),
            sweep_interval_secs: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source (for testing).
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SESSION_KEEPER_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("SESSION_KEEPER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(name) = var("SESSION_KEEPER_ID_NAME") {
            self.session.identifier_name = name;
        }

        if let Some(secs) = var("SESSION_KEEPER_MAX_LIFETIME").and_then(|s| s.parse().ok()) {
            self.session.max_lifetime_secs = secs;
        }

        if let Some(transport) = var("SESSION_KEEPER_TRANSPORT") {
            self.session.transport = transport;
        }

        if let Some(level) = var("SESSION_KEEPER_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref name) = args.id_name {
            self.session.identifier_name = name.clone();
        }

        if let Some(secs) = args.max_lifetime {
            self.session.max_lifetime_secs = secs;
        }

        if let Some(ref transport) = args.transport {
            self.session.transport = transport.clone();
        }

        if let Some(secs) = args.sweep_interval {
            self.session.sweep_interval_secs = Some(secs);
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the HTTP server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Convert the session section into a manager configuration.
    ///
    /// Only the transport name is checked here; the manager validates the
    /// rest when it is constructed.
    pub fn to_manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        let transport: TransportMode = self
            .session
            .transport
            .parse()
            .map_err(|_| ConfigError::InvalidTransport(self.session.transport.clone()))?;

        let mut manager_config = ManagerConfig::new(
            self.session.identifier_name.clone(),
            self.session.max_lifetime_secs,
        )
        .with_transport(transport);

        if let Some(secs) = self.session.sweep_interval_secs {
            manager_config = manager_config.with_sweep_interval(Duration::from_secs(secs));
        }

        Ok(manager_config)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Unknown transport mode name.
    InvalidTransport(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidTransport(mode) => {
                write!(f, "invalid transport mode: {} (expected query or cookie)", mode)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
