//! Process configuration, read from environment variables.
//!
//! | Variable        | Default        |
//! |-----------------|----------------|
//! | `TINYBANK_ADDR` | `0.0.0.0:8080` |
//! | `LOG_LEVEL`     | `debug`        |
//! | `LOG_FORMAT`    | `json`         |

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;
use tinybank_observability::{LogConfig, LogFormat, ParseLogFormatError};
use tracing::Level;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TINYBANK_ADDR `{value}`: {source}")]
    InvalidAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid LOG_LEVEL `{0}` (expected trace, debug, info, warn or error)")]
    InvalidLogLevel(String),

    #[error("invalid LOG_FORMAT: {0}")]
    InvalidLogFormat(#[from] ParseLogFormatError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_addr = var("TINYBANK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let level = match var("LOG_LEVEL") {
            Some(raw) => raw
                .trim()
                .parse::<Level>()
                .map_err(|_| ConfigError::InvalidLogLevel(raw.clone()))?,
            None => Level::DEBUG,
        };

        let format = match var("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::Json,
        };

        Ok(Self {
            addr,
            log: LogConfig { level, format },
        })
    }
}
