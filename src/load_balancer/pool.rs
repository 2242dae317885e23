//! Server pool management.
//!
//! # Responsibilities
//! - Own the configured servers in configuration order
//! - Partition them into available and unavailable
//! - Apply the load balancing algorithm to the available subset
//! - Serialize health transitions and cursor movement

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::validation::validate_servers;
use crate::config::{ClientConfig, ConfigError, ServerConfig, Strategy};
use crate::load_balancer::{
    from_strategy,
    server::{Server, ServerState},
    LoadBalancer,
};
use crate::observability::metrics;

/// Owns the servers of one client and their health partition.
#[derive(Debug)]
pub struct ServerPool {
    /// Configured servers; never added to or removed from.
    servers: Vec<Server>,
    inner: Mutex<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    /// One state per entry of `servers`, same order.
    states: Vec<ServerState>,
    balancer: Box<dyn LoadBalancer>,
}

impl PoolInner {
    /// Position of server `index` within the available subset.
    fn available_position(&self, index: usize) -> usize {
        self.states[..index].iter().filter(|s| s.is_available()).count()
    }

    fn available_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_available()).count()
    }
}

impl ServerPool {
    /// Create a pool from an ordered server list. All servers start available.
    pub fn new(configs: &[ServerConfig], strategy: Strategy) -> Result<Self, ConfigError> {
        validate_servers(configs).map_err(ConfigError::Validation)?;

        let servers = configs
            .iter()
            .map(Server::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let pool = Self {
            inner: Mutex::new(PoolInner {
                states: vec![ServerState::Available; servers.len()],
                balancer: from_strategy(strategy),
            }),
            servers,
        };
        metrics::record_available_servers(pool.servers.len());
        Ok(pool)
    }

    /// Create a pool from a full client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(&config.servers, config.strategy)
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        // States are plain values, so a panic elsewhere cannot leave them half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_of(&self, server: &Server) -> Option<usize> {
        self.servers.iter().position(|s| s.same_as(server))
    }

    /// Number of configured servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Always false: a pool cannot be built without servers.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// All configured servers in configuration order.
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Servers currently marked available, in configuration order.
    pub fn available_servers(&self) -> Vec<Server> {
        self.filtered(ServerState::Available)
    }

    /// Servers currently marked unavailable, in configuration order.
    pub fn unavailable_servers(&self) -> Vec<Server> {
        self.filtered(ServerState::Unavailable)
    }

    fn filtered(&self, wanted: ServerState) -> Vec<Server> {
        let inner = self.lock();
        self.servers
            .iter()
            .zip(inner.states.iter())
            .filter(|(_, state)| **state == wanted)
            .map(|(server, _)| server.clone())
            .collect()
    }

    /// Number of servers currently available.
    pub fn available_count(&self) -> usize {
        self.lock().available_count()
    }

    /// Health state of a server, or `None` if it is not part of this pool.
    pub fn state_of(&self, server: &Server) -> Option<ServerState> {
        let index = self.index_of(server)?;
        Some(self.lock().states[index])
    }

    /// Consistent view of every server and its state.
    pub fn snapshot(&self) -> Vec<(Server, ServerState)> {
        let inner = self.lock();
        self.servers.iter().cloned().zip(inner.states.iter().copied()).collect()
    }

    /// Select the next candidate among available servers.
    pub fn select(&self) -> Option<Server> {
        let mut inner = self.lock();
        let available: Vec<usize> = inner
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_available())
            .map(|(i, _)| i)
            .collect();

        match inner.balancer.next_index(available.len()) {
            Some(position) => available.get(position).map(|&i| self.servers[i].clone()),
            None => {
                tracing::debug!(server_count = self.servers.len(), "No available servers in pool");
                None
            }
        }
    }

    /// Move a server to the unavailable set.
    ///
    /// Idempotent. Returns true if the server changed state.
    pub fn mark_unavailable(&self, server: &Server) -> bool {
        self.transition(server, ServerState::Unavailable)
    }

    /// Move a server back to the available set.
    ///
    /// Idempotent. Returns true if the server changed state.
    pub fn mark_available(&self, server: &Server) -> bool {
        self.transition(server, ServerState::Available)
    }

    fn transition(&self, server: &Server, to: ServerState) -> bool {
        let Some(index) = self.index_of(server) else {
            tracing::warn!(server = %server, "Ignoring state change for unknown server");
            return false;
        };

        let mut inner = self.lock();
        if inner.states[index] == to {
            return false;
        }

        let position = inner.available_position(index);
        inner.states[index] = to;
        match to {
            ServerState::Unavailable => inner.balancer.on_removed(position),
            ServerState::Available => inner.balancer.on_restored(position),
        }
        let available = inner.available_count();
        drop(inner);

        match to {
            ServerState::Unavailable => {
                tracing::warn!(server = %self.servers[index], available, "Server marked unavailable")
            }
            ServerState::Available => {
                tracing::info!(server = %self.servers[index], available, "Server marked available")
            }
        }
        metrics::record_server_state(&self.servers[index], to);
        metrics::record_available_servers(available);
        true
    }
}
