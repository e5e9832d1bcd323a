//! Sliding-window rate limiter shared by every outbound request
//!
//! Each [`RateLimiter::acquire`] reserves a send slot under one exclusive
//! lock: evict stale timestamps, compute the earliest permitted instant,
//! append it. The caller then sleeps until its slot outside the lock, so
//! concurrent callers queue behind each other instead of bursting.
//!
//! Timing uses [`tokio::time::Instant`], which makes the limiter testable
//! under a paused tokio clock.

use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Rate limiter settings
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests in any rolling window
    pub max_requests: usize,

    /// Length of the rolling window
    pub time_window: Duration,

    /// Minimum gap between consecutive requests
    pub min_delay: Duration,

    /// Upper bound of the randomized gap
    pub max_delay: Duration,

    /// Randomize the gap between `min_delay` and `max_delay`
    pub random_delay: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            time_window: Duration::from_secs(60),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            random_delay: true,
        }
    }
}

/// Read-only snapshot of limiter activity
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterMetrics {
    /// Requests issued since creation or the last reset
    pub total_requests: u64,

    /// Requests recorded in the current window
    pub current_window_requests: usize,

    /// Observed rate over the current window
    pub requests_per_second: f64,

    /// Mean gap between consecutive requests in the window, in seconds
    pub average_delay: f64,

    /// Mean time callers waited inside `acquire`, in seconds
    pub average_wait: f64,

    pub max_requests: usize,
    pub time_window: Duration,
}

#[derive(Debug, Default)]
struct WindowState {
    /// Reserved send instants, non-decreasing
    slots: VecDeque<Instant>,
    last_slot: Option<Instant>,
    total_requests: u64,
    total_wait: Duration,
}

impl WindowState {
    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.slots.front() {
            if *front + window <= now {
                self.slots.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Process-wide request rate limiter
///
/// Construct one per process and share it behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(mut config: RateLimiterConfig) -> Self {
        config.max_requests = config.max_requests.max(1);
        if config.max_delay < config.min_delay {
            config.max_delay = config.min_delay;
        }

        Self {
            config,
            state: Mutex::new(WindowState::default()),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Wait until one request may be sent, and record it
    ///
    /// Returns how long the caller waited. Never fails; callers that need a
    /// deadline wrap this in `tokio::time::timeout`.
    pub async fn acquire(&self) -> Duration {
        let now = Instant::now();
        let slot = self.reserve(now);

        if slot > now {
            debug!(wait_ms = (slot - now).as_millis() as u64, "Rate limiter delaying request");
            tokio::time::sleep_until(slot).await;
        }

        slot - now
    }

    /// Compute and record the next permitted send instant
    fn reserve(&self, now: Instant) -> Instant {
        let mut state = self.lock();
        state.evict(now, self.config.time_window);

        let mut slot = now;

        let len = state.slots.len();
        if len >= self.config.max_requests {
            let anchor = state.slots[len - self.config.max_requests];
            slot = slot.max(anchor + self.config.time_window);
        }

        if let Some(last) = state.last_slot {
            slot = slot.max(last + self.next_gap());
        }

        state.slots.push_back(slot);
        state.last_slot = Some(slot);
        state.total_requests += 1;
        state.total_wait += slot - now;

        slot
    }

    fn next_gap(&self) -> Duration {
        let min = self.config.min_delay;
        let max = self.config.max_delay;

        if !self.config.random_delay || max <= min {
            return min;
        }

        let secs = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Snapshot of current activity; safe to call while others acquire
    pub fn get_metrics(&self) -> RateLimiterMetrics {
        let now = Instant::now();
        let mut state = self.lock();
        state.evict(now, self.config.time_window);

        let current = state.slots.len();

        let requests_per_second = match state.slots.front() {
            Some(oldest) if now > *oldest => current as f64 / (now - *oldest).as_secs_f64(),
            _ => 0.0,
        };

        let average_delay = if current > 1 {
            let span = state.slots[current - 1] - state.slots[0];
            span.as_secs_f64() / (current - 1) as f64
        } else {
            0.0
        };

        let average_wait = if state.total_requests > 0 {
            state.total_wait.as_secs_f64() / state.total_requests as f64
        } else {
            0.0
        };

        RateLimiterMetrics {
            total_requests: state.total_requests,
            current_window_requests: current,
            requests_per_second,
            average_delay,
            average_wait,
            max_requests: self.config.max_requests,
            time_window: self.config.time_window,
        }
    }

    /// Forget all recorded requests
    pub fn reset(&self) {
        *self.lock() = WindowState::default();
    }

    /// Snapshot of the reserved slots in the current window
    #[cfg(test)]
    fn slots(&self) -> Vec<Instant> {
        self.lock().slots.iter().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        // The critical sections never panic midway, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
