//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call issued
//!     → pool.rs (lock, collect available servers)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through available servers)
//!     → server.rs (candidate with pre-computed base URL)
//!     → Return candidate or None when nothing is available
//! ```
//!
//! # Design Decisions
//! - Selection and health transitions share one lock, so the cursor and the
//!   available/unavailable partition always change together
//! - Unavailable servers are excluded from selection until re-admitted
//! - Strategy is chosen once, at pool construction

pub mod pool;
pub mod round_robin;
pub mod server;

use std::fmt::Debug;

use crate::config::Strategy;

pub use pool::ServerPool;
pub use round_robin::RoundRobin;
pub use server::{Server, ServerState};

/// A server selection algorithm over the available subset.
///
/// Implementations only see positions, never servers; the pool maps positions
/// back to servers and reports every change to the subset it selects from.
pub trait LoadBalancer: Debug + Send {
    /// Pick a position in an available subset of size `available`.
    /// Returns `None` when the subset is empty.
    fn next_index(&mut self, available: usize) -> Option<usize>;

    /// The server at `position` in the available subset was removed.
    fn on_removed(&mut self, _position: usize) {}

    /// A server was re-inserted into the available subset at `position`.
    fn on_restored(&mut self, _position: usize) {}
}

/// Build the selector for a strategy identifier.
pub fn from_strategy(strategy: Strategy) -> Box<dyn LoadBalancer> {
    match strategy {
        Strategy::RoundRobin => Box::new(RoundRobin::new()),
    }
}
