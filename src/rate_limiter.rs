//! Adaptive rate limiter for outbound catalog requests.
//!
//! The secondary catalog is an unauthenticated public endpoint, so the
//! client keeps a polite minimum interval between requests and backs off
//! when calls start failing: failures double the interval (up to a cap),
//! a run of successes walks it back down to the base.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Enforces a minimum interval between requests with backoff on failure.
pub struct RateLimiter {
    name: &'static str,
    last_request: Option<Instant>,
    current_interval: Duration,
    base_interval: Duration,
    max_interval: Duration,
    success_streak: u32,
    successes_to_reduce: u32,
}

impl RateLimiter {
    /// * `base_interval` — minimum time between requests
    /// * `max_interval` — upper bound after repeated failures
    /// * `successes_to_reduce` — consecutive successes before the interval
    ///   is halved again (0 disables recovery)
    pub fn new(
        name: &'static str,
        base_interval: Duration,
        max_interval: Duration,
        successes_to_reduce: u32,
    ) -> Self {
        RateLimiter {
            name,
            last_request: None,
            current_interval: base_interval,
            base_interval,
            max_interval,
            success_streak: 0,
            successes_to_reduce,
        }
    }

    /// Convenience: base interval in milliseconds, max = 16× base,
    /// recovery after 10 successes.
    pub fn from_millis(name: &'static str, millis: u64) -> Self {
        let base = Duration::from_millis(millis);
        Self::new(name, base, base * 16, 10)
    }

    /// Sleep if not enough time has elapsed since the last request.
    /// Must be called *before* making a request.
    pub fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.current_interval {
                let wait = self.current_interval - elapsed;
                debug!(
                    limiter = self.name,
                    wait_secs = wait.as_secs_f64(),
                    "rate limiting"
                );
                thread::sleep(wait);
            }
        }
        self.last_request = Some(Instant::now());
    }

    /// Report a successful request.  After enough consecutive successes
    /// the interval is halved, down to the base.
    pub fn report_success(&mut self) {
        if self.successes_to_reduce == 0 {
            return;
        }

        self.success_streak += 1;

        if self.success_streak >= self.successes_to_reduce
            && self.current_interval > self.base_interval
        {
            self.current_interval = (self.current_interval / 2).max(self.base_interval);
            debug!(
                limiter = self.name,
                interval_secs = self.current_interval.as_secs_f64(),
                "interval reduced after success streak"
            );
            self.success_streak = 0;
        }
    }

    /// Report a failed request.  Doubles the interval, up to the max.
    pub fn report_failure(&mut self) {
        self.current_interval = (self.current_interval * 2).min(self.max_interval);
        debug!(
            limiter = self.name,
            interval_secs = self.current_interval.as_secs_f64(),
            "interval increased after failure"
        );
        self.success_streak = 0;
    }

    #[cfg(test)]
    fn current_interval(&self) -> Duration {
        self.current_interval
    }
}
