//! Counters shared by workers of a single parallel kernel.
//!
//! Each kernel writes disjoint cells, except for these values, which every
//! worker may touch: the kinetic-energy sum, the "interaction changed the
//! surface" flag and the per-rigid-body hit counters.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

/// Fixed-point scale applied to floating-point contributions.
pub const ENERGY_SCALE: f32 = 100_000.0;

/// Sum of floating-point values stored as scaled integers so that concurrent
/// additions commute exactly.
#[derive(Debug, Default)]
pub struct AtomicAccumulator {
    value: AtomicI64,
}

impl AtomicAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value * ENERGY_SCALE`, truncated toward zero.
    #[inline]
    pub fn add_f32_scaled(&self, value: f32) {
        let scaled = (value * ENERGY_SCALE) as i64;
        if scaled != 0 {
            self.value.fetch_add(scaled, Ordering::Relaxed);
        }
    }

    /// Current sum in scaled units.
    pub fn load_scaled(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Current sum converted back to real units.
    pub fn load(&self) -> f32 {
        self.load_scaled() as f32 / ENERGY_SCALE
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// One-shot flag raised by any worker.
#[derive(Debug, Default)]
pub struct AtomicFlag {
    raised: AtomicBool,
}

impl AtomicFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns `true` for the worker that raised it first.
    #[inline]
    pub fn try_set_flag(&self) -> bool {
        self.raised
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Returns the current state and lowers the flag.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}

/// Per-slot counters handing out unique write positions.
#[derive(Debug, Default)]
pub struct SlotCounters {
    counts: Vec<AtomicUsize>,
}

impl SlotCounters {
    pub fn new(slots: usize) -> Self {
        Self {
            counts: (0..slots).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Increments slot `slot` and returns the new count.
    #[inline]
    pub fn fetch_add_int(&self, slot: usize) -> usize {
        self.counts[slot].fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, slot: usize) -> usize {
        self.counts[slot].load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        for c in &self.counts {
            c.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_parallel_scaled_sum_is_exact() {
        let acc = AtomicAccumulator::new();
        (0..10_000).into_par_iter().for_each(|_| acc.add_f32_scaled(0.001));
        assert_eq!(acc.load_scaled(), 1_000_000);
        acc.reset();
        assert_eq!(acc.load(), 0.0);
    }

    #[test]
    fn test_flag_raised_once() {
        let flag = AtomicFlag::new();
        let winners: usize = (0..256)
            .into_par_iter()
            .map(|_| usize::from(flag.try_set_flag()))
            .sum();
        assert_eq!(winners, 1);
        assert!(flag.take());
        assert!(!flag.is_set());
    }

    #[test]
    fn test_slot_counters_hand_out_unique_positions() {
        let counters = SlotCounters::new(2);
        let mut positions: Vec<usize> = (0..100)
            .into_par_iter()
            .map(|_| counters.fetch_add_int(1))
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=100).collect::<Vec<_>>());
        assert_eq!(counters.get(0), 0);
    }
}
