//! Server configuration.
//!
//! [`ServerConfig`] derives `Deserialize` with `#[serde(default)]`, so it can
//! be embedded in an application's own config file and only the fields that
//! differ need to be written down. [`ServerConfig::from_env`] reads the same
//! fields from `WICK_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Listener and connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub addr: SocketAddr,

    /// HTTP/1 keep-alive.
    pub keep_alive: bool,

    /// How long a client may take to send its request headers.
    pub header_read_timeout_ms: u64,

    /// Put the failure message into `500` responses instead of a generic one.
    pub expose_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            keep_alive: true,
            header_read_timeout_ms: 60_000,
            expose_errors: false,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `WICK_ADDR`, `WICK_KEEP_ALIVE`,
    /// `WICK_HEADER_READ_TIMEOUT_MS`, `WICK_EXPOSE_ERRORS` and `WICK_ENV`.
    ///
    /// `WICK_ENV=development` turns on `expose_errors` unless
    /// `WICK_EXPOSE_ERRORS` says otherwise.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("WICK_ADDR") {
            config.addr = addr.parse().map_err(|_| Error::InvalidAddress(addr))?;
        }
        if let Some(v) = lookup("WICK_KEEP_ALIVE") {
            config.keep_alive = parse_bool("WICK_KEEP_ALIVE", &v)?;
        }
        if let Some(v) = lookup("WICK_HEADER_READ_TIMEOUT_MS") {
            config.header_read_timeout_ms = v
                .parse()
                .map_err(|_| Error::Config(format!("WICK_HEADER_READ_TIMEOUT_MS: `{v}` is not a number")))?;
        }
        if lookup("WICK_ENV").is_some_and(|env| env == "development") {
            config.expose_errors = true;
        }
        if let Some(v) = lookup("WICK_EXPOSE_ERRORS") {
            config.expose_errors = parse_bool("WICK_EXPOSE_ERRORS", &v)?;
        }

        Ok(config)
    }

    pub fn header_read_timeout(&self) -> Duration {
        Duration::from_millis(self.header_read_timeout_ms)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key}: `{value}` is not a boolean"))),
    }
}
