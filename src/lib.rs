//! Multi-server HTTP request layer for InfluxDB-style time-series databases.

pub mod config;
pub mod error;
pub mod http;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::ClientConfig;
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use http::{Request, RequestDispatcher, Response};
pub use load_balancer::{Server, ServerState};
