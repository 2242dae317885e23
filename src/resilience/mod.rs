//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Exchange with a candidate server:
//!     → timeouts.rs (enforce the effective deadline)
//!     → On transport failure: retries.rs (budget left? try another server)
//!     → Pool marks the failed server unavailable
//! ```
//!
//! # Design Decisions
//! - Timeouts are enforced by the dispatcher, not left to the transport
//! - Timeout expiry is a transport failure like any other connectivity fault
//! - Retries move to a different server instead of waiting on the same one

pub mod retries;
pub mod timeouts;

pub use retries::RetryBudget;
pub use timeouts::TimeoutPolicy;
