//! Runtime server configuration
//!
//! `AppConfig` is rebuilt from the environment on every launch and is
//! immutable for the lifetime of the process.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("Failed to resolve home directory for the default database path")]
    NoHomeDirectory,

    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Database path must not be empty")]
    EmptyDatabasePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database file (FLOWCHART_DB_PATH)
    pub database_path: PathBuf,

    /// Bind address (FLOWCHART_HOST)
    pub host: IpAddr,

    /// Listen port (FLOWCHART_PORT)
    pub port: u16,

    /// Time budget per store operation (FLOWCHART_REQUEST_TIMEOUT_MS)
    pub request_timeout: Duration,

    /// Single allowed CORS origin; localhost dev origins when unset
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup("FLOWCHART_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        let config = AppConfig {
            database_path,
            host: parse_or(&lookup, "FLOWCHART_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: parse_or(&lookup, "FLOWCHART_PORT", DEFAULT_PORT)?,
            request_timeout: Duration::from_millis(parse_or(
                &lookup,
                "FLOWCHART_REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )?),
            cors_allow_origin: lookup("CORS_ALLOW_ORIGIN").filter(|o| !o.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// `~/.flowchart/database/flowchart.db`
pub fn default_database_path() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(home_dir
        .join(".flowchart")
        .join("database")
        .join("flowchart.db"))
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}
