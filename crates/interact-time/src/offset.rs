//! Server clock offset and cooldown arithmetic
//!
//! The offset is `local - server`, estimated from one `getTime` round trip
//! assuming symmetric latency. Server time is then `local - offset`.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

/// Estimate `local - server` from one round trip.
///
/// `sent_ms` and `received_ms` are local readings around the request,
/// `server_ms` is the time the server reported.
pub fn estimate_offset(sent_ms: u64, received_ms: u64, server_ms: u64) -> i64 {
    let round_trip = received_ms.saturating_sub(sent_ms) as i64;
    received_ms as i64 - round_trip / 2 - server_ms as i64
}

/// Shared server clock offset
#[derive(Debug, Default)]
pub struct ServerClock {
    offset_ms: AtomicI64,
}

impl ServerClock {
    pub fn new() -> Self {
        ServerClock::default()
    }

    /// Record a `getTime` round trip and return the new offset
    pub fn record(&self, sent_ms: u64, received_ms: u64, server_ms: u64) -> i64 {
        let offset = estimate_offset(sent_ms, received_ms, server_ms);
        self.offset_ms.store(offset, Ordering::Release);
        debug!(offset_ms = offset, "server clock offset updated");
        offset
    }

    #[inline]
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Acquire)
    }

    /// Convert a local reading to server time
    #[inline]
    pub fn to_server(&self, local_ms: u64) -> u64 {
        (local_ms as i64 - self.offset_ms()).max(0) as u64
    }

    /// Server-time deadline `duration_ms` after `local_ms`
    pub fn cooldown_deadline(&self, local_ms: u64, duration_ms: u64) -> u64 {
        self.to_server(local_ms).saturating_add(duration_ms)
    }

    /// Milliseconds left until `deadline_ms`, never negative
    pub fn remaining(&self, local_ms: u64, deadline_ms: u64) -> u64 {
        deadline_ms.saturating_sub(self.to_server(local_ms))
    }
}
