//! Time sources
//!
//! Record timestamps are taken from a [`TimeSource`] at commit time so tests
//! can drive a deterministic clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time in milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl Timestamp {
    /// Create a timestamp from Unix milliseconds.
    pub fn from_ms(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Whole seconds since the Unix epoch.
    pub fn as_secs(self) -> u64 {
        self.ts_ms / 1000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.ts_ms)
    }
}

/// Source of commit timestamps.
pub trait TimeSource: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        // Clocks set before 1970 collapse to the epoch.
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        Timestamp { ts_ms }
    }
}

/// Manually driven time source for tests and replays.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    ts_ms: AtomicU64,
}

impl ManualTimeSource {
    /// Start the clock at the given Unix milliseconds.
    pub fn new(start_ms: u64) -> Self {
        Self {
            ts_ms: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, delta_ms: u64) {
        self.ts_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute time.
    pub fn set(&self, ts_ms: u64) {
        self.ts_ms.store(ts_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp {
            ts_ms: self.ts_ms.load(Ordering::SeqCst),
        }
    }
}
