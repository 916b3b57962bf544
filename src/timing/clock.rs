use std::cell::Cell;
use std::time::{Duration, Instant};

/// Millisecond time source the scheduler reads and waits on.
pub trait Clock {
    fn now_ms(&self) -> f64;
    /// Block until `deadline_ms`; returns immediately if it has passed.
    fn sleep_until_ms(&self, deadline_ms: f64);
}

/// Monotonic wall clock, zeroed at construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn sleep_until_ms(&self, deadline_ms: f64) {
        let remaining = deadline_ms - self.now_ms();
        if remaining > 0.0 && remaining.is_finite() {
            std::thread::sleep(Duration::from_secs_f64(remaining / 1000.0));
        }
    }
}

/// Hand-driven clock for tests: waiting jumps straight to the deadline.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }

    fn sleep_until_ms(&self, deadline_ms: f64) {
        if deadline_ms > self.now.get() {
            self.now.set(deadline_ms);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timing/clock.rs"]
mod tests;
