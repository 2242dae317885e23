//! Retry logic.
//!
//! # Responsibilities
//! - Bound the number of exchanges one logical call may make
//! - Decide whether another candidate may be tried
//!
//! # Design Decisions
//! - Budget is per logical call, never shared across calls
//! - Budget equals the configured pool size: each server at most once per call
//! - Only transport failures consume budget; any completed exchange ends the call
//! - No backoff: the next attempt goes to a different server

/// Attempt budget of one logical call.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    limit: usize,
    used: usize,
}

impl RetryBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// Consume one attempt. Returns false when the budget is already spent.
    pub fn try_acquire(&mut self) -> bool {
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    /// Attempts consumed so far.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.used
    }
}
