//! A count-evicting sliding window, shared by the rate limiter (§4.2) and
//! the quota manager's per-minute limit (§4.3).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tracks timestamps within a trailing window and evicts stale ones on
/// every call. Not thread-safe by itself; callers hold a mutex around it,
/// same as every other piece of shared mutable state in this workspace.
#[derive(Debug, Clone)]
pub struct SlidingWindowCounter {
    window: Duration,
    limit: u32,
    timestamps: VecDeque<Instant>,
}

impl SlidingWindowCounter {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            window,
            limit,
            timestamps: VecDeque::new(),
        }
    }

    fn evict_stale(&mut self, now: Instant) {
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Evicts stale timestamps, then admits and records `now` if the
    /// resulting count is within `limit`. Returns `(allowed, remaining)`.
    pub fn check_and_consume(&mut self, now: Instant) -> (bool, u32) {
        self.evict_stale(now);

        if self.timestamps.len() as u32 >= self.limit {
            return (false, 0);
        }

        self.timestamps.push_back(now);
        let remaining = self.limit - self.timestamps.len() as u32;
        (true, remaining)
    }

    /// The instant the oldest retained timestamp falls out of the window;
    /// `None` if the window is currently empty.
    pub fn reset_at(&self) -> Option<Instant> {
        self.timestamps.front().map(|&front| front + self.window)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
