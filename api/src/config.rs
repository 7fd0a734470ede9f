//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Largest accepted `LOOKOUT_QUERY_TIMEOUT_SECS` (one day).
const MAX_QUERY_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Metrics storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsStorage {
    /// No reader; every metrics query answers "metrics unavailable".
    #[default]
    None,
    /// In-process reader serving registered families.
    Memory,
}

impl FromStr for MetricsStorage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "disabled" => Ok(Self::None),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => bail!("Unknown metrics storage type: {other}"),
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `LOOKOUT_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `LOOKOUT_PORT`: The port to listen on (default: 16686)
/// - `LOOKOUT_METRICS_STORAGE`: `none` or `memory` (default: `none`); the `memory`
///   store starts empty and is filled through `AppState::memory_reader`
/// - `LOOKOUT_QUERY_TIMEOUT_SECS`: Per-request query timeout, `0` for none, at most one day (default: 30)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Which metrics reader to wire into the query service.
    pub metrics_storage: MetricsStorage,
    /// Deadline applied to each metrics query, if any.
    pub query_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `LOOKOUT_PORT` is set but cannot be parsed as a valid port number
    /// - `LOOKOUT_METRICS_STORAGE` names an unknown backend
    /// - `LOOKOUT_QUERY_TIMEOUT_SECS` is not a whole number of seconds, or
    ///   exceeds `MAX_QUERY_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("LOOKOUT_HOST").unwrap_or(defaults.host);

        let port = std::env::var("LOOKOUT_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("Invalid LOOKOUT_PORT")?
            .unwrap_or(defaults.port);

        let metrics_storage = std::env::var("LOOKOUT_METRICS_STORAGE")
            .ok()
            .map(|s| s.parse::<MetricsStorage>())
            .transpose()?
            .unwrap_or(defaults.metrics_storage);

        let query_timeout = match std::env::var("LOOKOUT_QUERY_TIMEOUT_SECS") {
            Ok(secs) => parse_query_timeout(&secs)?,
            Err(_) => defaults.query_timeout,
        };

        Ok(Self {
            host,
            port,
            metrics_storage,
            query_timeout,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

/// Parses a query timeout in seconds; `0` disables the timeout.
fn parse_query_timeout(value: &str) -> Result<Option<Duration>> {
    let secs = value
        .trim()
        .parse::<u64>()
        .context("Invalid LOOKOUT_QUERY_TIMEOUT_SECS")?;
    if secs > MAX_QUERY_TIMEOUT_SECS {
        bail!("LOOKOUT_QUERY_TIMEOUT_SECS must be at most {MAX_QUERY_TIMEOUT_SECS}, got {secs}");
    }
    Ok((secs > 0).then_some(Duration::from_secs(secs)))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 16686,
            metrics_storage: MetricsStorage::None,
            query_timeout: Some(Duration::from_secs(30)),
        }
    }
}
