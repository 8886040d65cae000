//! Connection Monitor - tracks incoming spine frames to detect link aliveness
//!
//! Uses monotonic time anchored to the first access, so it is unaffected by
//! system clock changes and fits in an `AtomicU64`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static APP_START: OnceLock<Instant> = OnceLock::new();

/// Monotonic microseconds since the first call
fn get_monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Link health monitor
///
/// The acquisition thread calls [`register_frame`](Self::register_frame) after
/// every successful read.
pub struct ConnectionMonitor {
    last_frame: AtomicU64,
    timeout: Duration,
}

impl ConnectionMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_frame: AtomicU64::new(get_monotonic_micros()),
            timeout,
        }
    }

    /// Returns true if a frame arrived within the timeout window
    pub fn check_connection(&self) -> bool {
        self.time_since_last_frame() < self.timeout
    }

    pub fn register_frame(&self) {
        self.last_frame.store(get_monotonic_micros(), Ordering::Relaxed);
    }

    pub fn time_since_last_frame(&self) -> Duration {
        let last_us = self.last_frame.load(Ordering::Relaxed);
        Duration::from_micros(get_monotonic_micros().saturating_sub(last_us))
    }
}
