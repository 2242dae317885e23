//! Timeout enforcement.
//!
//! # Responsibilities
//! - Hold the global default timeout, readable and writable at any time
//! - Resolve the effective timeout of one logical call
//! - Wrap exchanges with that deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities, independent of the transport
//! - A zero duration means "no timeout", both globally and per call
//! - A per-call override never touches the global default

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{self, error::Elapsed};

/// Global default timeout with per-call overrides.
#[derive(Debug, Default)]
pub struct TimeoutPolicy {
    /// Default timeout in milliseconds, 0 = none.
    default_ms: AtomicU64,
}

impl TimeoutPolicy {
    pub fn new(default: Option<Duration>) -> Self {
        let policy = Self::default();
        policy.set_default(default);
        policy
    }

    /// Current global default.
    pub fn default_timeout(&self) -> Option<Duration> {
        match self.default_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Replace the global default. `None` or a zero duration disables it.
    pub fn set_default(&self, timeout: Option<Duration>) {
        let ms = timeout.map(duration_to_millis).unwrap_or(0);
        self.default_ms.store(ms, Ordering::Relaxed);
    }

    /// Timeout that applies to a call with the given override.
    pub fn effective(&self, call_override: Option<Duration>) -> Option<Duration> {
        match call_override {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => self.default_timeout(),
        }
    }
}

// Sub-millisecond durations round up so they still count as a deadline.
fn duration_to_millis(d: Duration) -> u64 {
    if d.is_zero() {
        return 0;
    }
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Run `fut` under an optional deadline.
pub async fn with_deadline<F: Future>(deadline: Option<Duration>, fut: F) -> Result<F::Output, Elapsed> {
    match deadline {
        Some(d) => time::timeout(d, fut).await,
        None => Ok(fut.await),
    }
}
