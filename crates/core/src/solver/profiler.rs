//! Timing helpers for simulation kernels and ticks.
//!
//! Provides RAII-style kernel scopes that report through `tracing` and a
//! rolling tick timer.

use std::time::{Duration, Instant};

use tracing::trace;

/// Measures a kernel from creation to drop and emits a `trace!` event.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
}

impl ProfilerScope {
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        trace!(kernel = self.name, elapsed_ms = self.elapsed_ms(), "Kernel finished");
    }
}

/// Last and exponentially averaged tick durations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimer {
    last: Duration,
    average_ms: f64,
    samples: u64,
}

impl FrameTimer {
    /// Weight of the newest sample in the running average.
    const SMOOTHING: f64 = 0.1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.average_ms = if self.samples == 0 {
            ms
        } else {
            self.average_ms + (ms - self.average_ms) * Self::SMOOTHING
        };
        self.last = elapsed;
        self.samples += 1;
    }

    pub fn last_ms(&self) -> f64 {
        self.last.as_secs_f64() * 1000.0
    }

    pub fn average_ms(&self) -> f64 {
        self.average_ms
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}
