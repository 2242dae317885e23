//! HTTP request subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (query/write layer)
//!     → request.rs (method, path, query, body, timeout override)
//!     → dispatcher.rs (pick candidate, enforce deadline, classify outcome)
//!     → transport.rs (one exchange against one server)
//!     → response.rs (status, headers, body returned verbatim)
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod transport;

pub use dispatcher::RequestDispatcher;
pub use request::{Method, Request};
pub use response::Response;
pub use transport::{Exchange, ReqwestTransport, Transport};
