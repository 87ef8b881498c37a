//! Fixed-window rate limiting per API key.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Rate limit state for one key.
#[derive(Debug, Clone)]
struct WindowState {
    request_count: u32,
    window_start: DateTime<Utc>,
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Limited {
        reset_at: DateTime<Utc>,
        retry_after_ms: i64,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Whole seconds until the window resets, at least 1.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateLimitResult::Allowed { .. } => None,
            RateLimitResult::Limited { retry_after_ms, .. } => {
                Some(((*retry_after_ms as u64).div_ceil(1000)).max(1))
            }
        }
    }
}

/// Per-key request counters.
///
/// Not synchronized; callers wrap it in a mutex.
#[derive(Debug)]
pub struct ApiKeyRateLimiter {
    window: Duration,
    states: HashMap<String, WindowState>,
}

impl ApiKeyRateLimiter {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
            states: HashMap::new(),
        }
    }

    /// Counts a request for `key_id`. A `max_requests` of 0 disables the limit.
    pub fn check(&mut self, key_id: &str, max_requests: u32) -> RateLimitResult {
        self.check_at(key_id, max_requests, Utc::now())
    }

    pub fn check_at(&mut self, key_id: &str, max_requests: u32, now: DateTime<Utc>) -> RateLimitResult {
        if max_requests == 0 {
            return RateLimitResult::Allowed {
                remaining: u32::MAX,
                reset_at: now + self.window,
            };
        }

        let state = self
            .states
            .entry(key_id.to_string())
            .or_insert(WindowState {
                request_count: 0,
                window_start: now,
            });

        if now >= state.window_start + self.window {
            state.request_count = 0;
            state.window_start = now;
        }

        let reset_at = state.window_start + self.window;
        if state.request_count >= max_requests {
            return RateLimitResult::Limited {
                reset_at,
                retry_after_ms: (reset_at - now).num_milliseconds().max(0),
            };
        }

        state.request_count += 1;
        RateLimitResult::Allowed {
            remaining: max_requests - state.request_count,
            reset_at,
        }
    }

    /// Drops state for windows that have ended.
    pub fn cleanup(&mut self) {
        let now = Utc::now();
        let window = self.window;
        self.states
            .retain(|_, state| state.window_start + window > now);
    }

    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }
}

impl Default for ApiKeyRateLimiter {
    fn default() -> Self {
        Self::new(60_000)
    }
}
