//! Request dispatching across the server pool.
//!
//! # Responsibilities
//! - Select a candidate for each attempt of a logical call
//! - Issue the exchange under the effective timeout
//! - Separate transport failures from completed exchanges
//! - Mark failed servers unavailable and retry on another candidate
//!
//! # Design Decisions
//! - Attempts are strictly sequential; no speculative parallel requests
//! - Each configured server is tried at most once per logical call
//! - Any completed exchange ends the call, whatever its status code
//! - No background re-probing: unavailable servers stay out until re-admitted

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ConfigError};
use crate::error::{Error, Result, TransportError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::transport::{Exchange, ReqwestTransport, Transport};
use crate::load_balancer::{Server, ServerPool};
use crate::observability::metrics::{self, Outcome};
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{RetryBudget, TimeoutPolicy};

/// Multi-server request layer.
///
/// Cloning is cheap; clones share the pool, the cursor and the timeout policy.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Debug)]
struct DispatcherInner {
    pool: ServerPool,
    timeouts: TimeoutPolicy,
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    /// Create a dispatcher using the default `reqwest` transport.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a dispatcher over a custom transport.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let pool = ServerPool::from_config(config)?;
        let timeouts = TimeoutPolicy::new(config.timeouts.request());

        tracing::info!(
            servers = pool.len(),
            strategy = %config.strategy,
            timeout_ms = config.timeouts.request_ms,
            "Request dispatcher initialized"
        );

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                pool,
                timeouts,
                transport,
            }),
        })
    }

    /// `GET path` under the global timeout.
    pub async fn get(&self, path: impl Into<String>) -> Result<Response> {
        self.execute(Request::get(path)).await
    }

    /// `GET path` with an optional per-call timeout.
    pub async fn get_with_timeout(&self, path: impl Into<String>, timeout: Option<Duration>) -> Result<Response> {
        self.execute(with_optional_timeout(Request::get(path), timeout)).await
    }

    /// `POST path` with a raw body under the global timeout.
    pub async fn post(&self, path: impl Into<String>, body: impl Into<Bytes>) -> Result<Response> {
        self.execute(Request::post(path).body(body)).await
    }

    /// `POST path` with an optional per-call timeout.
    pub async fn post_with_timeout(
        &self,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        self.execute(with_optional_timeout(Request::post(path).body(body), timeout))
            .await
    }

    /// `GET /ping`; InfluxDB answers 204 with its version header.
    pub async fn ping(&self) -> Result<Response> {
        self.get("/ping").await
    }

    /// Run one logical call.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let start = Instant::now();
        let pool = &self.inner.pool;

        request.validate()?;

        if pool.available_count() == 0 {
            tracing::warn!(path = %request.path(), "No available server for request");
            metrics::record_request(None, Outcome::NoAvailableServer, start);
            return Err(Error::NoAvailableServer);
        }

        let deadline = self.inner.timeouts.effective(request.timeout_override());
        let mut budget = RetryBudget::new(pool.len());
        let mut last_error: Option<TransportError> = None;

        while budget.try_acquire() {
            let Some(server) = pool.select() else {
                break;
            };
            let url = request.url_for(&server)?;

            tracing::debug!(
                server = %server,
                attempt = budget.used(),
                method = %request.method(),
                path = %request.path(),
                timeout = ?deadline,
                "Dispatching request"
            );

            match self.attempt(&server, url, &request, deadline).await {
                Ok(response) => {
                    tracing::debug!(
                        server = %server,
                        status = %response.status(),
                        elapsed = ?start.elapsed(),
                        "Request completed"
                    );
                    metrics::record_request(Some(&server), Outcome::Response, start);
                    return Ok(response);
                }
                Err(err) => {
                    tracing::warn!(
                        server = %server,
                        attempt = budget.used(),
                        remaining = budget.remaining(),
                        code = err.code(),
                        error = %err.message,
                        "Transport failure, trying next server"
                    );
                    metrics::record_transport_failure(&server, err.kind);
                    pool.mark_unavailable(&server);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(last) => {
                let attempts = budget.used();
                tracing::error!(attempts, error = %last, "All servers unavailable");
                metrics::record_request(Some(&last.server), Outcome::AllServersUnavailable, start);
                Err(Error::AllServersUnavailable { attempts, last })
            }
            // Another call emptied the pool between the check and the first selection.
            None => {
                metrics::record_request(None, Outcome::NoAvailableServer, start);
                Err(Error::NoAvailableServer)
            }
        }
    }

    async fn attempt(
        &self,
        server: &Server,
        url: url::Url,
        request: &Request,
        deadline: Option<Duration>,
    ) -> std::result::Result<Response, TransportError> {
        let exchange = self.inner.transport.send(Exchange { server, url, request });
        match with_deadline(deadline, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::timed_out(server.clone(), deadline.unwrap_or_default())),
        }
    }

    /// Global default timeout; `None` means no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeouts.default_timeout()
    }

    /// Replace the global default timeout. `None` or zero disables it.
    pub fn set_timeout(&self, timeout: Option<Duration>) {
        self.inner.timeouts.set_default(timeout);
        tracing::debug!(timeout = ?self.timeout(), "Global timeout updated");
    }

    /// Servers currently available, in configuration order.
    pub fn available_servers(&self) -> Vec<Server> {
        self.inner.pool.available_servers()
    }

    /// Servers currently unavailable, in configuration order.
    pub fn unavailable_servers(&self) -> Vec<Server> {
        self.inner.pool.unavailable_servers()
    }

    /// Re-admit a server after an external check. Returns true if it changed state.
    pub fn mark_available(&self, server: &Server) -> bool {
        self.inner.pool.mark_available(server)
    }

    /// Take a server out of rotation. Returns true if it changed state.
    pub fn mark_unavailable(&self, server: &Server) -> bool {
        self.inner.pool.mark_unavailable(server)
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ServerPool {
        &self.inner.pool
    }
}

fn with_optional_timeout(request: Request, timeout: Option<Duration>) -> Request {
    match timeout {
        Some(t) => request.timeout(t),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::TransportErrorKind;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Status(u16),
        Refuse,
        Hang,
    }

    /// In-memory transport scripted per host.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        behaviors: Mutex<HashMap<String, Behavior>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: &[(&str, Behavior)]) -> Arc<Self> {
            let transport = Self::default();
            for (host, behavior) in script {
                transport.set(host, *behavior);
            }
            Arc::new(transport)
        }

        fn set(&self, host: &str, behavior: Behavior) {
            self.behaviors.lock().unwrap().insert(host.to_string(), behavior);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, exchange: Exchange<'_>) -> std::result::Result<Response, TransportError> {
            let host = exchange.server.host.clone();
            self.calls.lock().unwrap().push(host.clone());
            let behavior = self.behaviors.lock().unwrap().get(&host).copied().unwrap_or(Behavior::Refuse);

            match behavior {
                Behavior::Status(code) => Ok(Response::new(
                    exchange.server.clone(),
                    StatusCode::from_u16(code).unwrap(),
                    HeaderMap::new(),
                    host,
                )),
                Behavior::Refuse => Err(TransportError::new(
                    exchange.server.clone(),
                    TransportErrorKind::ConnectionRefused,
                    "connection refused",
                )),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    unreachable!("the dispatcher deadline fires first")
                }
            }
        }
    }

    fn dispatcher(hosts: &[&str], transport: Arc<ScriptedTransport>) -> RequestDispatcher {
        let config = ClientConfig::with_servers(hosts.iter().map(|h| ServerConfig::new(*h, 8086)).collect());
        RequestDispatcher::with_transport(&config, transport).unwrap()
    }

    fn hosts(servers: Vec<Server>) -> Vec<String> {
        servers.into_iter().map(|s| s.host).collect()
    }

    #[tokio::test]
    async fn test_round_robin_with_failover() {
        let transport = ScriptedTransport::new(&[
            ("a", Behavior::Status(204)),
            ("b", Behavior::Refuse),
            ("c", Behavior::Status(204)),
        ]);
        let dispatcher = dispatcher(&["a", "b", "c"], transport.clone());

        let first = dispatcher.get("/ping").await.unwrap();
        assert_eq!(first.server().host, "a");

        let second = dispatcher.get("/ping").await.unwrap();
        assert_eq!(second.server().host, "c");

        assert_eq!(transport.calls(), vec!["a", "b", "c"]);
        assert_eq!(hosts(dispatcher.unavailable_servers()), vec!["b"]);
        assert_eq!(hosts(dispatcher.available_servers()), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_one_reachable_server_succeeds() {
        for n in 1..=5usize {
            let names: Vec<String> = (0..n).map(|i| format!("s{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();

            // Only the last server answers.
            let transport = ScriptedTransport::new(&[(refs[n - 1], Behavior::Status(200))]);
            let dispatcher = dispatcher(&refs, transport.clone());

            let response = dispatcher.get("/ping").await.unwrap();
            assert_eq!(response.server().host, refs[n - 1]);
            assert!(transport.calls().len() <= n);
            assert_eq!(hosts(dispatcher.unavailable_servers()), names[..n - 1].to_vec());
        }
    }

    #[tokio::test]
    async fn test_all_servers_down() {
        let transport = ScriptedTransport::new(&[]);
        let dispatcher = dispatcher(&["a", "b", "c"], transport.clone());

        let err = dispatcher.get("/ping").await.unwrap_err();
        match err {
            Error::AllServersUnavailable { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.kind, TransportErrorKind::ConnectionRefused);
                assert_eq!(last.server.host, "c");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut calls = transport.calls();
        calls.sort();
        assert_eq!(calls, vec!["a", "b", "c"], "each server tried exactly once");
        assert!(dispatcher.available_servers().is_empty());

        // Nothing left to try on the next call.
        assert!(matches!(dispatcher.get("/ping").await, Err(Error::NoAvailableServer)));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_unchanged() {
        let transport = ScriptedTransport::new(&[("a", Behavior::Status(500)), ("b", Behavior::Status(200))]);
        let dispatcher = dispatcher(&["a", "b"], transport.clone());

        let response = dispatcher.post("/write", "cpu value=1").await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(transport.calls(), vec!["a"]);
        assert!(dispatcher.unavailable_servers().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        let transport = ScriptedTransport::new(&[("a", Behavior::Hang), ("b", Behavior::Status(200))]);
        let dispatcher = dispatcher(&["a", "b"], transport.clone());
        dispatcher.set_timeout(Some(Duration::from_millis(20)));

        let response = dispatcher.get("/ping").await.unwrap();
        assert_eq!(response.server().host, "b");
        assert_eq!(hosts(dispatcher.unavailable_servers()), vec!["a"]);
    }

    #[tokio::test]
    async fn test_timeout_error_code() {
        let transport = ScriptedTransport::new(&[("a", Behavior::Hang)]);
        let dispatcher = dispatcher(&["a"], transport);

        let err = dispatcher
            .get_with_timeout("/ping", Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.transport_error().unwrap().code(), "ECONNABORTED");
    }

    #[tokio::test]
    async fn test_override_does_not_change_global_default() {
        let transport = ScriptedTransport::new(&[("a", Behavior::Status(204))]);
        let dispatcher = dispatcher(&["a"], transport);
        dispatcher.set_timeout(Some(Duration::from_secs(3)));

        dispatcher
            .execute(Request::get("/ping").timeout(Duration::from_millis(50)))
            .await
            .unwrap();
        assert_eq!(dispatcher.timeout(), Some(Duration::from_secs(3)));

        dispatcher.set_timeout(None);
        assert_eq!(dispatcher.timeout(), None);
    }

    #[tokio::test]
    async fn test_readmitted_server_is_selected_again() {
        let transport = ScriptedTransport::new(&[("a", Behavior::Refuse), ("b", Behavior::Status(200))]);
        let dispatcher = dispatcher(&["a", "b"], transport.clone());

        dispatcher.get("/ping").await.unwrap();
        let a = dispatcher.unavailable_servers().remove(0);

        transport.set("a", Behavior::Status(200));
        assert!(dispatcher.mark_available(&a));

        let mut answered = Vec::new();
        for _ in 0..2 {
            answered.push(dispatcher.get("/ping").await.unwrap().server().host.clone());
        }
        answered.sort();
        assert_eq!(answered, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_request_sends_nothing() {
        let transport = ScriptedTransport::new(&[("a", Behavior::Status(200))]);
        let dispatcher = dispatcher(&["a"], transport.clone());

        let err = dispatcher.get("http://other/ping").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_the_pool() {
        let transport = ScriptedTransport::new(&[
            ("a", Behavior::Status(200)),
            ("b", Behavior::Refuse),
            ("c", Behavior::Status(200)),
            ("d", Behavior::Status(200)),
        ]);
        let dispatcher = dispatcher(&["a", "b", "c", "d"], transport);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.get("/ping").await })
            })
            .collect();

        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert_ne!(response.server().host, "b");
        }

        assert_eq!(hosts(dispatcher.unavailable_servers()), vec!["b"]);
        assert_eq!(hosts(dispatcher.available_servers()), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_empty_server_list_is_rejected() {
        let err = RequestDispatcher::new(&ClientConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigError::Validation(_))));
    }
}
