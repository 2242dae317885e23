//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject empty server lists
//! - Validate host and port values
//! - Detect servers configured twice under the same identity
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before any server pool is built, so no network activity happens on failure

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{ClientConfig, ServerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one server must be configured")]
    NoServers,

    #[error("server #{index} has an empty host")]
    EmptyHost { index: usize },

    #[error("server #{index} ({host}) has invalid port 0")]
    InvalidPort { index: usize, host: String },

    #[error("server {host}:{port} is configured more than once")]
    DuplicateServer { host: String, port: u16 },
}

/// Validate a full client configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    validate_servers(&config.servers)
}

/// Validate an ordered server list.
pub fn validate_servers(servers: &[ServerConfig]) -> Result<(), Vec<ValidationError>> {
    if servers.is_empty() {
        return Err(vec![ValidationError::NoServers]);
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, server) in servers.iter().enumerate() {
        let host = server.host.trim();
        if host.is_empty() {
            errors.push(ValidationError::EmptyHost { index });
            continue;
        }
        if server.port == 0 {
            errors.push(ValidationError::InvalidPort {
                index,
                host: host.to_string(),
            });
        }
        if !seen.insert((host.to_ascii_lowercase(), server.port)) {
            errors.push(ValidationError::DuplicateServer {
                host: host.to_string(),
                port: server.port,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
