//! Bounded reconnect bookkeeping.

use std::time::Duration;

/// Default number of connect attempts before a session gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed wait between connect attempts.
pub const DEFAULT_BACKOFF_DELAY: Duration = Duration::from_secs(2);

/// What to do after a failed connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after `after`.
    Retry { attempt: u32, after: Duration },
    /// `attempts` consecutive failures; stop trying.
    Exhausted { attempts: u32 },
}

/// Counts consecutive connect failures against a fixed budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempt_count: u32,
    max_attempts: u32,
    backoff_delay: Duration,
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_DELAY)
    }
}

impl RetryState {
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff_delay: Duration) -> Self {
        Self {
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            backoff_delay,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_delay(&self) -> Duration {
        self.backoff_delay
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }

    /// Record one failed attempt and decide whether to try again.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempt_count = self.attempt_count.saturating_add(1);
        if self.is_exhausted() {
            RetryDecision::Exhausted {
                attempts: self.attempt_count,
            }
        } else {
            RetryDecision::Retry {
                attempt: self.attempt_count,
                after: self.backoff_delay,
            }
        }
    }

    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }
}
