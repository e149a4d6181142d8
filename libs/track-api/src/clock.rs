use std::time::{Duration, Instant};

/// Time source for the publication loop.
///
/// Wall-clock reads stamp records; monotonic reads drive the simulation.
/// Tests swap in their own implementation to get fixed or sequenced times.
pub trait Clock: Send + Sync {
    /// Unix time in milliseconds.
    fn now_ms(&self) -> i64;

    /// Time elapsed since an arbitrary fixed origin. Never goes backwards.
    fn monotonic(&self) -> Duration;
}

/// Production clock: `SystemTime` for timestamps, `Instant` for elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        crate::now_ms()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}
