//! Fixed-window request limiting keyed by category and client.
//!
//! [`FixedWindowLimiter`] keeps its counters in this process only. Several
//! server processes each count separately; a shared counter store would need
//! another [`RateLimiter`] implementation.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitCategory {
    Login,
    Contact,
}

impl LimitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitCategory::Login => "login",
            LimitCategory::Contact => "contact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub login: Limit,
    pub contact: Limit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: Limit {
                max_requests: 5,
                window: Duration::from_secs(15 * 60),
            },
            contact: Limit {
                max_requests: 3,
                window: Duration::from_secs(15 * 60),
            },
        }
    }
}

impl RateLimitConfig {
    fn limit(&self, category: LimitCategory) -> Limit {
        match category {
            LimitCategory::Login => self.login,
            LimitCategory::Contact => self.contact,
        }
    }
}

/// Returned when a request is over its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(pub Duration);

pub trait RateLimiter: Send + Sync {
    /// Count one request; `Err` when the caller has to wait.
    fn check(&self, category: LimitCategory, client: &str) -> Result<(), RetryAfter>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    windows: DashMap<(LimitCategory, String), Window>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn check_at(&self, category: LimitCategory, client: &str, now: Instant) -> Result<(), RetryAfter> {
        let limit = self.config.limit(category);
        let mut window = self
            .windows
            .entry((category, client.to_string()))
            .or_insert(Window { started: now, count: 0 });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= limit.window {
            *window = Window { started: now, count: 0 };
        }

        if window.count >= limit.max_requests {
            let retry = limit.window.saturating_sub(now.saturating_duration_since(window.started));
            debug!(category = category.as_str(), client, count = window.count, "rate limit exceeded");
            return Err(RetryAfter(retry));
        }
        window.count += 1;
        Ok(())
    }

    /// Drop windows that have fully elapsed.
    pub fn purge_expired(&self, now: Instant) {
        let config = self.config;
        self.windows.retain(|(category, _), window| {
            now.saturating_duration_since(window.started) < config.limit(*category).window
        });
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, category: LimitCategory, client: &str) -> Result<(), RetryAfter> {
        self.check_at(category, client, Instant::now())
    }
}
