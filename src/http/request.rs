//! Request description.
//!
//! # Responsibilities
//! - Describe one logical call independently of the server that will serve it
//! - Carry the optional per-call timeout override
//! - Build the absolute URL for a chosen candidate
//!
//! # Design Decisions
//! - A request is a plain value built before the call, never mutated in flight
//! - Paths are relative to the server root; absolute URLs are rejected
//! - The body is `Bytes`, so retries against another server never copy it

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::load_balancer::Server;

/// HTTP method of a logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical call, before a server has been chosen.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Append a query parameter. Parameters already present in the path are kept.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Raw body, e.g. line protocol for `/write`.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with the matching content type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(value).map_err(|e| Error::InvalidRequest(format!("JSON body: {}", e)))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    /// Timeout for this call only, including its retries. Zero disables the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Reject paths that cannot be served by any server.
    ///
    /// Only the part before `?` is checked; an inline query may hold anything.
    pub fn validate(&self) -> Result<()> {
        let path = self.path.split_once('?').map_or(self.path.as_str(), |(p, _)| p);
        if path.contains("://") {
            return Err(Error::InvalidRequest(format!(
                "expected a server-relative path, got '{}'",
                self.path
            )));
        }
        if path.chars().any(|c| c.is_control() || c == ' ') {
            return Err(Error::InvalidRequest(format!("path contains invalid characters: {:?}", self.path)));
        }
        Ok(())
    }

    /// Absolute URL of this request on `server`.
    pub fn url_for(&self, server: &Server) -> Result<Url> {
        self.validate()?;

        let mut url = server.base_url().clone();
        let (path, inline_query) = match self.path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (self.path.as_str(), None),
        };

        if path.starts_with('/') {
            url.set_path(path);
        } else {
            url.set_path(&format!("/{}", path));
        }
        url.set_query(inline_query.filter(|q| !q.is_empty()));

        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}
