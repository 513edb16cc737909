//! # Cache Settings
//!
//! Process-wide connection settings, loaded from the environment or JSON.

use std::fmt;
use std::num::ParseIntError;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the full connection URL.
pub const ENV_REDIS_URL: &str = "REDIS_URL";
/// Environment variable holding the fallback host.
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
/// Environment variable holding the fallback port.
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";

/// Host used when neither the URL nor `REDIS_HOST` names one.
pub const DEFAULT_HOST: &str = "localhost";
/// Port used when neither the URL nor `REDIS_PORT` names one.
pub const DEFAULT_PORT: u16 = 6379;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// `REDIS_PORT` is not a valid port number.
    #[error("invalid REDIS_PORT value {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// JSON settings could not be deserialized.
    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Connection settings for the cache/broker service.
///
/// `url` takes precedence when set and non-empty; `host` and `port` are only
/// consulted otherwise. Nothing here is validated.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CacheSettings {
    /// Full connection URL, e.g. `rediss://:password@host:port`.
    #[serde(default)]
    pub url: Option<String>,
    /// Fallback host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Fallback port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            url: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

// The URL usually carries a password.
impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl CacheSettings {
    /// Reads `REDIS_URL`, `REDIS_HOST` and `REDIS_PORT` from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CacheSettings::from_env`], with an injected variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(ENV_REDIS_PORT) {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|source| SettingsError::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };

        Ok(CacheSettings {
            url: lookup(ENV_REDIS_URL),
            host: lookup(ENV_REDIS_HOST).unwrap_or_else(default_host),
            port,
        })
    }

    /// Parses settings from JSON; missing fields take their defaults.
    pub fn from_json(input: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Connection URL, if one is set and non-empty.
    pub fn connection_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}
