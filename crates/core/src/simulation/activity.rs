//! Awake/asleep state machine that gates the expensive kernels.
//!
//! A tick is *active* when the kinetic energy of the last substep exceeds the
//! threshold or an interaction changed the heights. Active ticks force
//! [`AwakeStatus::Awake`]; quiet ticks count up until the limit is reached and
//! the surface falls asleep.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::solver::ENERGY_SCALE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwakeStatus {
    Awake,
    /// Still simulated, counting quiet ticks
    GettingAsleep,
    Asleep,
}

impl AwakeStatus {
    /// `Awake` and `GettingAsleep` both count as awake.
    #[inline]
    pub fn is_awake(self) -> bool {
        !matches!(self, AwakeStatus::Asleep)
    }
}

/// Change of the awake class, reported once per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityEdge {
    WokeUp,
    FellAsleep,
}

#[derive(Debug, Clone)]
pub struct ActivityScheduler {
    status: AwakeStatus,
    counter: u32,
    limit: u32,
    /// Threshold in accumulator units
    threshold_scaled: i64,
}

impl ActivityScheduler {
    /// Creates an asleep scheduler. The quiet counter starts saturated, so a
    /// quiet first tick keeps it asleep without firing an edge.
    ///
    /// # Arguments
    ///
    /// * `limit` - Quiet ticks before falling asleep, at least 1
    /// * `energy_threshold` - Kinetic energy at or below which a tick is quiet
    pub fn new(limit: u32, energy_threshold: f32) -> Self {
        let limit = limit.max(1);
        Self {
            status: AwakeStatus::Asleep,
            counter: limit,
            limit,
            threshold_scaled: (energy_threshold * ENERGY_SCALE).round() as i64,
        }
    }

    #[inline]
    pub fn status(&self) -> AwakeStatus {
        self.status
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.status.is_awake()
    }

    /// Quiet ticks counted so far.
    #[inline]
    pub fn quiet_ticks(&self) -> u32 {
        self.counter
    }

    pub fn set_limits(&mut self, limit: u32, energy_threshold: f32) {
        self.limit = limit.max(1);
        self.counter = self.counter.min(self.limit);
        self.threshold_scaled = (energy_threshold * ENERGY_SCALE).round() as i64;
    }

    /// Advances the state machine by one tick.
    ///
    /// # Arguments
    ///
    /// * `energy_scaled` - Kinetic energy of the tick in accumulator units
    /// * `interaction` - Whether an interactor changed any height this tick
    ///
    /// Returns the edge when the awake class changed.
    pub fn update(&mut self, energy_scaled: i64, interaction: bool) -> Option<ActivityEdge> {
        let was_awake = self.is_awake();

        if interaction || energy_scaled > self.threshold_scaled {
            self.status = AwakeStatus::Awake;
            self.counter = 0;
        } else if self.status != AwakeStatus::Asleep {
            self.counter = (self.counter + 1).min(self.limit);
            self.status = if self.counter >= self.limit {
                AwakeStatus::Asleep
            } else {
                AwakeStatus::GettingAsleep
            };
        }

        self.edge_from(was_awake)
    }

    /// Wakes the surface immediately, as after a manual height edit.
    pub fn force_awake(&mut self) -> Option<ActivityEdge> {
        let was_awake = self.is_awake();
        self.status = AwakeStatus::Awake;
        self.counter = 0;
        self.edge_from(was_awake)
    }

    fn edge_from(&self, was_awake: bool) -> Option<ActivityEdge> {
        match (was_awake, self.is_awake()) {
            (false, true) => {
                info!("Surface woke up");
                Some(ActivityEdge::WokeUp)
            }
            (true, false) => {
                info!(quiet_ticks = self.counter, "Surface fell asleep");
                Some(ActivityEdge::FellAsleep)
            }
            _ => None,
        }
    }
}
