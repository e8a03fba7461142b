use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

/// Outcome of a rate-limit check. A refusal is a value, not an error —
/// the handler turns it into a 429 with the key surfaced for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum RateDecision {
    Allowed,
    Limited {
        key: String,
        retry_after_secs: i64,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Per-key sliding-window request admission.
///
/// Admits a request when fewer than `max_requests` have been admitted for
/// the same key within the trailing `window`. Stale timestamps are pruned
/// on every check, so memory is bounded by distinct keys times the window.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
    max_requests: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
            clock,
        }
    }

    /// Check and record one request for `key`. Synchronous and
    /// non-suspending; the critical section holds no await point.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        let cutoff = now - self.window;

        let mut windows = self.windows.lock().unwrap();
        let timestamps = windows.entry(key.to_string()).or_default();
        timestamps.retain(|&t| t > cutoff);

        if timestamps.len() < self.max_requests {
            timestamps.push(now);
            RateDecision::Allowed
        } else {
            // Oldest admitted timestamp decides when the next slot opens.
            let retry_after_secs = timestamps
                .first()
                .map(|&oldest| (oldest + self.window - now).num_seconds().max(0))
                .unwrap_or(0);
            tracing::debug!("Rate limit hit for key '{}'", key);
            RateDecision::Limited {
                key: key.to_string(),
                retry_after_secs,
            }
        }
    }

    /// Number of keys currently tracked (test and monitoring aid).
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}
