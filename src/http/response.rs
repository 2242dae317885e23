//! Response of a completed exchange.
//!
//! Any completed exchange is a response, 4xx and 5xx included. Interpreting the
//! payload (an error object inside a 200, for instance) is up to the caller.

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::load_balancer::Server;

/// Status, headers and body of a completed exchange, returned verbatim.
#[derive(Debug, Clone)]
pub struct Response {
    server: Server,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(server: Server, status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            server,
            status,
            headers,
            body: body.into(),
        }
    }

    /// The server that answered.
    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}
