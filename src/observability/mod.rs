//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pool and dispatcher produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → Whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Every per-attempt event names the server it concerns
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
