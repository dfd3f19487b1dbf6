// src/config/models.rs
use crate::health::Dog;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub health_check: HealthCheckConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            path: "/health-check".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Upper bound for any single check; a check exceeding it reports down.
    pub timeout_secs: u64,
    pub ping: PingCheckConfig,
    pub dog: DogCheckConfig,
}

impl HealthCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            ping: PingCheckConfig::default(),
            dog: DogCheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PingCheckConfig {
    pub key: String,
    pub url: Url,
    pub timeout_secs: u64,
}

impl PingCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PingCheckConfig {
    fn default() -> Self {
        Self {
            key: "nestjs-docs".to_string(),
            url: Url::parse("https://docs.nestjs.com").expect("default ping URL is valid"),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DogCheckConfig {
    pub key: String,
    pub dogs: Vec<Dog>,
}

impl Default for DogCheckConfig {
    fn default() -> Self {
        Self {
            key: "dog".to_string(),
            dogs: vec![Dog::new("Fido", "goodboy"), Dog::new("Rex", "badboy")],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Health check key must not be empty")]
    EmptyKey,

    #[error("Duplicate health check key: {0}")]
    DuplicateKey(String),

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("Route path must start with '/': {0}")]
    InvalidPath(String),

    #[error("Unsupported ping URL scheme: {0}")]
    UnsupportedScheme(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.server.path.clone()));
        }

        let health = &self.health_check;
        if health.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("Health check"));
        }
        if health.ping.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("Ping"));
        }

        match health.ping.url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        let mut seen = HashSet::new();
        for key in [&health.ping.key, &health.dog.key] {
            if key.is_empty() {
                return Err(ConfigError::EmptyKey);
            }
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::DuplicateKey(key.clone()));
            }
        }

        Ok(())
    }
}
