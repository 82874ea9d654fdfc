//! Configuration management for Roster.
//!
//! Values are layered: built-in defaults, an optional YAML file, then
//! `ROSTER__*` environment variables (for example
//! `ROSTER__RATE_LIMITING__LIMIT=10`). Command line flags are applied on top
//! by the binary. Configuration is read once at startup.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, RosterError};

/// Main configuration for the Roster service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Roster data configuration
    #[serde(default)]
    pub data: DataConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per identity within one window
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Sliding window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Charge a penalty entry when an admitted request fails downstream
    #[serde(default = "default_penalize_failures")]
    pub penalize_failures: bool,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_secs: default_window_secs(),
            penalize_failures: default_penalize_failures(),
        }
    }
}

impl RateLimitingConfig {
    /// The window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_limit() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_penalize_failures() -> bool {
    true
}

/// Roster data configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to a YAML file seeding the in-memory roster store
    pub roster_path: Option<String>,
}

impl RosterConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: RosterConfig = serde_yaml::from_str(&contents)
            .map_err(|e| RosterError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from defaults, an optional YAML file and the
    /// `ROSTER` environment prefix.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::new(path, config::FileFormat::Yaml).required(true),
            );
        }

        let config: RosterConfig = builder
            .add_source(
                config::Environment::with_prefix("ROSTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| RosterError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limiting.limit == 0 {
            return Err(RosterError::Config(
                "rate_limiting.limit must be greater than zero".to_string(),
            ));
        }
        if self.rate_limiting.window_secs == 0 {
            return Err(RosterError::Config(
                "rate_limiting.window_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
