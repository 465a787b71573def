//! Sliding-window rate limiting.
//!
//! Per-key attempt counting over a trailing time window. State is owned
//! by the limiter instance (no process-wide registry) and lives only in
//! memory: this is a best-effort client-side throttle, not a security
//! boundary on its own. Server-side enforcement must back it up.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Soft cap on tracked keys; beyond it, fully-expired windows are pruned.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Per-key sliding-window attempt counter.
///
/// Callers pass the current time explicitly (milliseconds since epoch),
/// which keeps the limiter deterministic under test.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<u64>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u64>>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record an attempt for `key` and decide whether to admit it.
    ///
    /// Timestamps older than `window_ms` are discarded first; the
    /// attempt is admitted iff the retained count (including this one)
    /// is within `max_attempts`. Blocked attempts are still recorded, so
    /// hammering a blocked key keeps the window extended rather than
    /// resetting it early.
    pub fn is_allowed(&self, key: &str, max_attempts: u32, window_ms: u64, now_ms: u64) -> bool {
        let mut windows = self.lock();

        let attempts = windows.entry(key.to_string()).or_default();
        attempts.retain(|&stamp| now_ms.saturating_sub(stamp) < window_ms);
        attempts.push(now_ms);

        let allowed = attempts.len() as u32 <= max_attempts;
        if !allowed {
            tracing::debug!(key, attempts = attempts.len(), "attempt blocked");
        }

        if windows.len() > MAX_TRACKED_KEYS {
            prune_expired(&mut windows, window_ms, now_ms);
        }

        allowed
    }

    /// Drop the window for `key` entirely.
    ///
    /// Called on successful authentication so a legitimate user is not
    /// penalized by earlier failures.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }
}

fn prune_expired(windows: &mut HashMap<String, Vec<u64>>, window_ms: u64, now_ms: u64) {
    windows.retain(|_, attempts| {
        attempts
            .iter()
            .any(|&stamp| now_ms.saturating_sub(stamp) < window_ms)
    });
}
