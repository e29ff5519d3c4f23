//! Sliding-window rate limiter
//!
//! Keeps the timestamps of accepted requests inside the window. A request
//! is rejected while `max_requests` of them are still in it; rejected
//! requests are not recorded.

use std::collections::VecDeque;

use contracts::RateLimitConfig;

/// Per-connection limiter for one message kind
#[derive(Debug)]
pub struct RateLimiter {
    window_ms: i64,
    max_requests: usize,
    accepted: VecDeque<i64>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            window_ms: i64::try_from(config.window_ms).unwrap_or(i64::MAX),
            max_requests: config.max_requests,
            accepted: VecDeque::with_capacity(config.max_requests),
        }
    }

    /// Record a request at `now_ms` if the window has room.
    pub fn try_acquire(&mut self, now_ms: i64) -> bool {
        let horizon = now_ms.saturating_sub(self.window_ms);
        while self.accepted.front().is_some_and(|&t| t <= horizon) {
            self.accepted.pop_front();
        }

        if self.accepted.len() >= self.max_requests {
            return false;
        }
        self.accepted.push_back(now_ms);
        true
    }

    /// Accepted requests still inside the window as of the last call
    pub fn in_window(&self) -> usize {
        self.accepted.len()
    }
}
