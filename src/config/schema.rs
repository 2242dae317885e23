//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;

/// Root configuration for a multi-server client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend server definitions, in selection order.
    pub servers: Vec<ServerConfig>,

    /// Server selection strategy.
    pub strategy: Strategy,

    /// Database name, used by the query/write layers above the dispatcher.
    pub database: Option<String>,

    /// Username for HTTP basic auth.
    pub username: Option<String>,

    /// Password for HTTP basic auth.
    pub password: Option<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// HTTP transport settings.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Build a config for the given servers, everything else defaulted.
    pub fn with_servers(servers: Vec<ServerConfig>) -> Self {
        Self {
            servers,
            ..Self::default()
        }
    }

    /// Credentials, if both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Hostname or IP address.
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL scheme used to reach the server.
    #[serde(default)]
    pub protocol: Protocol,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: Protocol::Http,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }
}

/// Default InfluxDB HTTP API port.
pub const DEFAULT_PORT: u16 = 8086;

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// URL scheme of a backend server. Passed through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(ConfigError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Server selection strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Strategy {
    #[default]
    #[serde(rename = "round-robin")]
    RoundRobin,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::RoundRobin => f.write_str("round-robin"),
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" | "roundrobin" | "rr" => Ok(Strategy::RoundRobin),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Timeout configuration.
///
/// There is no separate connect timeout: the effective timeout of a call also
/// bounds connection establishment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default timeout for one exchange in milliseconds (0 = none).
    pub request_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Option<Duration> {
        (self.request_ms > 0).then(|| Duration::from_millis(self.request_ms))
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// How long idle keep-alive connections are kept, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Honour HTTP(S)_PROXY environment variables.
    pub proxy_from_env: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("influx-pool/", env!("CARGO_PKG_VERSION")).to_string(),
            pool_idle_timeout_secs: 90,
            proxy_from_env: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
