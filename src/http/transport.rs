//! HTTP exchange primitive.
//!
//! # Responsibilities
//! - Perform one exchange against one server
//! - Turn a completed exchange into a [`Response`], whatever its status
//! - Classify connectivity faults into [`TransportErrorKind`]s
//!
//! # Design Decisions
//! - Transport is a trait so the dispatcher can be driven without a network
//! - Deadlines are applied by the dispatcher, not here
//! - Reading the body is part of the exchange: an aborted body is a transport failure

use std::error::Error as StdError;
use std::fmt::Debug;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{TransportError, TransportErrorKind};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::load_balancer::Server;

/// One attempt of a logical call against a chosen candidate.
#[derive(Debug)]
pub struct Exchange<'a> {
    pub server: &'a Server,
    pub url: Url,
    pub request: &'a Request,
}

/// Lower-layer HTTP primitive consumed by the dispatcher.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    async fn send(&self, exchange: Exchange<'_>) -> Result<Response, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    credentials: Option<(String, String)>,
}

impl ReqwestTransport {
    /// Build the HTTP client from the transport and credential settings.
    ///
    /// The client carries no timeouts of its own, so the dispatcher's deadline is the only one.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .user_agent(config.transport.user_agent.clone())
            .pool_idle_timeout(Duration::from_secs(config.transport.pool_idle_timeout_secs));

        if !config.transport.proxy_from_env {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|e| ConfigError::Transport(e.to_string()))?;
        let credentials = config
            .credentials()
            .map(|(user, pass)| (user.to_string(), pass.to_string()));

        Ok(Self { client, credentials })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, exchange: Exchange<'_>) -> Result<Response, TransportError> {
        let Exchange { server, url, request } = exchange;

        let mut builder = match request.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        builder = builder.headers(request.headers().clone());
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }
        if let Some((user, pass)) = &self.credentials {
            builder = builder.basic_auth(user, Some(pass));
        }

        let response = builder.send().await.map_err(|e| classify(server, &e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify(server, &e))?;

        Ok(Response::new(server.clone(), status, headers, body))
    }
}

/// Map a reqwest failure onto a transport error kind.
fn classify(server: &Server, error: &reqwest::Error) -> TransportError {
    let message = error_chain(error);

    let kind = if error.is_timeout() {
        TransportErrorKind::TimedOut
    } else if looks_like_hang_up(&message) {
        TransportErrorKind::ConnectionReset
    } else if let Some(io_kind) = io_error_kind(error) {
        match io_kind {
            io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => TransportErrorKind::ConnectionReset,
            io::ErrorKind::TimedOut => TransportErrorKind::TimedOut,
            _ if looks_like_dns(&message) => TransportErrorKind::Dns,
            _ => TransportErrorKind::Other,
        }
    } else if looks_like_dns(&message) {
        TransportErrorKind::Dns
    } else if error.is_body() || error.is_decode() {
        TransportErrorKind::ConnectionReset
    } else {
        TransportErrorKind::Other
    };

    TransportError::new(server.clone(), kind, message)
}

fn io_error_kind(error: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = err.source();
    }
    None
}

fn looks_like_dns(message: &str) -> bool {
    message.contains("dns error") || message.contains("failed to lookup address")
}

// Peer accepted the connection and closed it before a complete response.
fn looks_like_hang_up(message: &str) -> bool {
    message.contains("connection closed before message completed")
}

// reqwest's Display omits the underlying cause, which is the useful part.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
