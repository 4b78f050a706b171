//! Reconnect backoff

use std::time::Duration;

/// Default first retry delay
pub const DEFAULT_INITIAL_RETRY: Duration = Duration::from_secs(1);

/// Default retry delay cap
pub const DEFAULT_MAX_RETRY: Duration = Duration::from_secs(8);

/// Exponential backoff: doubles on every call to `next_delay`, capped at `max`
#[derive(Clone, Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Backoff {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns twice as much
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Peek at the delay the next call will return
    #[inline]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Back to the initial delay, after a successful connection
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(DEFAULT_INITIAL_RETRY, DEFAULT_MAX_RETRY)
    }
}
