//! Local clock sources

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of local wall-clock time in unix milliseconds
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The operating system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and simulations
///
/// Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<Mutex<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(start_ms)),
        }
    }

    /// Move time forward
    pub fn advance(&self, ms: u64) {
        let mut now = self.now.lock();
        *now = now.saturating_add(ms);
    }

    pub fn set(&self, ms: u64) {
        *self.now.lock() = ms;
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        *self.now.lock()
    }
}
