//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or connect URI
//!     → loader.rs / uri.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → consumed once by RequestDispatcher::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the server list never changes afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod uri;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ClientConfig, LogFormat, ObservabilityConfig, Protocol, ServerConfig, Strategy, TimeoutConfig,
    TransportConfig, DEFAULT_PORT,
};
pub use validation::ValidationError;
