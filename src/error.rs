//! Error types surfaced to callers of the dispatcher.
//!
//! A logical call either returns a [`Response`](crate::http::Response), whatever its
//! status code, or fails with one of the [`Error`] kinds below. Per-server
//! [`TransportError`]s are absorbed by the dispatcher and only reach the caller
//! wrapped in [`Error::AllServersUnavailable`].

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::load_balancer::server::Server;

/// Result alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a caller can observe.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty or malformed configuration. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// No server was available before the first attempt.
    #[error("no available server")]
    NoAvailableServer,

    /// Every candidate failed at the transport level within one logical call.
    #[error("all servers unavailable after {attempts} attempt(s), last error: {last}")]
    AllServersUnavailable { attempts: usize, last: TransportError },

    /// The request cannot be turned into a URL. Nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// The last transport failure, if this error carries one.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Error::AllServersUnavailable { last, .. } => Some(last),
            _ => None,
        }
    }

    /// True if the last transport failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        self.transport_error()
            .is_some_and(|e| e.kind == TransportErrorKind::TimedOut)
    }
}

/// Classification of a connectivity-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The effective timeout expired before the exchange completed.
    TimedOut,
    /// The server actively refused the connection.
    ConnectionRefused,
    /// The connection was reset or aborted mid-exchange.
    ConnectionReset,
    /// The host name could not be resolved.
    Dns,
    /// Any other transport fault.
    Other,
}

impl TransportErrorKind {
    /// Errno-style code, stable across transports.
    pub fn code(&self) -> &'static str {
        match self {
            TransportErrorKind::TimedOut => "ECONNABORTED",
            TransportErrorKind::ConnectionRefused => "ECONNREFUSED",
            TransportErrorKind::ConnectionReset => "ECONNRESET",
            TransportErrorKind::Dns => "ENOTFOUND",
            TransportErrorKind::Other => "EIO",
        }
    }

    /// Label value for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::TimedOut => "timed_out",
            TransportErrorKind::ConnectionRefused => "connection_refused",
            TransportErrorKind::ConnectionReset => "connection_reset",
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A connectivity failure against one specific server.
#[derive(Debug, Clone, Error)]
#[error("{kind} from {server}: {message}")]
pub struct TransportError {
    /// The server the exchange was attempted against.
    pub server: Server,
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(server: Server, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            server,
            kind,
            message: message.into(),
        }
    }

    pub fn timed_out(server: Server, after: std::time::Duration) -> Self {
        Self::new(
            server,
            TransportErrorKind::TimedOut,
            format!("timeout of {}ms exceeded", after.as_millis()),
        )
    }

    /// Errno-style code of the failure.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}
