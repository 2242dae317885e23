//! Metrics collection.
//!
//! # Responsibilities
//! - Define client metrics (requests, transport failures, latency, pool size)
//! - Track per-server and aggregate metrics
//!
//! # Metrics
//! - `influx_pool_requests_total` (counter): logical calls by server, outcome
//! - `influx_pool_transport_failures_total` (counter): failed exchanges by server, kind
//! - `influx_pool_request_duration_seconds` (histogram): logical call latency
//! - `influx_pool_available_servers` (gauge): size of the available set
//! - `influx_pool_server_available` (gauge): 1=available, 0=unavailable
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; installing an exporter is the
//!   embedding application's job
//! - Labels for server and outcome only, keeping cardinality bounded by the pool size

use std::time::Instant;

use metrics::{counter, gauge, histogram};

use crate::error::TransportErrorKind;
use crate::load_balancer::{Server, ServerState};

/// Outcome label of a logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Response,
    NoAvailableServer,
    AllServersUnavailable,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Response => "response",
            Outcome::NoAvailableServer => "no_available_server",
            Outcome::AllServersUnavailable => "all_servers_unavailable",
        }
    }
}

/// Record the end of a logical call.
pub fn record_request(server: Option<&Server>, outcome: Outcome, start: Instant) {
    let server = server.map(ToString::to_string).unwrap_or_else(|| "none".to_string());
    counter!(
        "influx_pool_requests_total",
        "server" => server,
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("influx_pool_request_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

/// Record one failed exchange against a server.
pub fn record_transport_failure(server: &Server, kind: TransportErrorKind) {
    counter!(
        "influx_pool_transport_failures_total",
        "server" => server.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a server health transition.
pub fn record_server_state(server: &Server, state: ServerState) {
    let value = if state.is_available() { 1.0 } else { 0.0 };
    gauge!("influx_pool_server_available", "server" => server.to_string()).set(value);
}

/// Record the current size of the available set.
pub fn record_available_servers(count: usize) {
    gauge!("influx_pool_available_servers").set(count as f64);
}
