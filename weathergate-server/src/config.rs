//! Server configuration from environment variables.

use std::path::Path;
use std::time::Duration;
use weathergate::openweather::DEFAULT_BASE_URL;
use weathergate::timeout::{DEFAULT_PROVIDER_TIMEOUT, DEFAULT_STORE_TIMEOUT};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const ENV_FILE: &str = ".env";

/// Load `path` into the process environment. Variables already set are kept.
///
/// Returns `Ok(false)` when the file does not exist.
///
/// # Errors
/// Returns `Err` if the file exists but cannot be read or parsed.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: &'static str },
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid { name: &'static str, value: String, reason: &'static str },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub redis_url: String,
    pub api_key: String,
    pub openweather_url: String,
    pub store_timeout: Duration,
    pub provider_timeout: Duration,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("redis_url", &self.redis_url)
            .field("api_key", &"<redacted>")
            .field("openweather_url", &self.openweather_url)
            .field("store_timeout", &self.store_timeout)
            .field("provider_timeout", &self.provider_timeout)
            .finish()
    }
}

impl ServerConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
                reason: "expected a port number",
            })?,
            None => DEFAULT_PORT,
        };

        let api_key =
            var("WEATHER_API_KEY").ok_or(ConfigError::Missing { name: "WEATHER_API_KEY" })?;

        Ok(Self {
            port,
            redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            api_key,
            openweather_url: var("OPENWEATHER_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            store_timeout: millis(
                var("STORE_TIMEOUT_MS"),
                "STORE_TIMEOUT_MS",
                DEFAULT_STORE_TIMEOUT,
            )?,
            provider_timeout: millis(
                var("PROVIDER_TIMEOUT_MS"),
                "PROVIDER_TIMEOUT_MS",
                DEFAULT_PROVIDER_TIMEOUT,
            )?,
        })
    }
}

fn millis(
    raw: Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else { return Ok(default) };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid { name, value: raw, reason: "must be greater than zero" }),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(_) => Err(ConfigError::Invalid { name, value: raw, reason: "expected milliseconds" }),
    }
}
