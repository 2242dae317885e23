//! Server abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server of the database
//! - Pre-compute its base URL
//! - Define server identity as the (host, port) pair
//!
//! Health state is not stored here; the pool owns it so that a server can never be
//! in both partitions at once.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use url::Url;

use crate::config::{ConfigError, Protocol, ServerConfig};

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Available = 0,
    Unavailable = 1,
}

impl ServerState {
    pub fn is_available(&self) -> bool {
        *self == ServerState::Available
    }
}

/// A single backend server.
#[derive(Debug, Clone, Serialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Pre-calculated base URL, e.g. `http://db1:8086/`.
    #[serde(skip)]
    base_url: Url,
}

impl Server {
    /// Create a server from its configuration entry.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let host = config.host.trim().to_string();
        let authority = if host.contains(':') {
            format!("[{}]:{}", host, config.port)
        } else {
            format!("{}:{}", host, config.port)
        };
        let base_url = Url::parse(&format!("{}://{}/", config.protocol, authority)).map_err(|e| {
            ConfigError::InvalidUri {
                uri: format!("{}://{}", config.protocol, authority),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            host,
            port: config.port,
            protocol: config.protocol,
            base_url,
        })
    }

    /// Base URL of the server, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// True if `other` designates the same server.
    pub fn same_as(&self, other: &Server) -> bool {
        self.port == other.port && self.host.eq_ignore_ascii_case(&other.host)
    }
}

impl PartialEq for Server {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Server {}

impl Hash for Server {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.to_ascii_lowercase().hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base_url.as_str();
        f.write_str(base.strip_suffix('/').unwrap_or(base))
    }
}
