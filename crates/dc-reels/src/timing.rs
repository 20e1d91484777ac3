//! Spin timing: step durations, stagger delays, cutoff

use std::time::Duration;

use dc_core::RandomSource;
use serde::{Deserialize, Serialize};

use crate::config::GameSettings;

/// Step duration at intensity 1.0 (ms)
pub const BASE_STEP_MS: f64 = 200.0;

/// Safety re-check interval while waiting for quiescence (ms)
pub const QUIESCENCE_POLL_MS: u64 = 20;

/// Share of the per-column slice used as stagger between reel starts
const STAGGER_FRACTION: f64 = 0.25;

/// Timing for one spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinTiming {
    /// Duration of one step (ms)
    pub step_duration_ms: f64,
    /// Time from spin start to cutoff (ms)
    pub total_duration_ms: f64,
    /// Upper bound of random extra time per step (ms)
    pub step_jitter_ms: f64,
}

impl SpinTiming {
    pub fn new(step_duration_ms: f64, total_duration_ms: f64) -> Self {
        Self {
            step_duration_ms,
            total_duration_ms,
            step_jitter_ms: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter_ms: f64) -> Self {
        self.step_jitter_ms = jitter_ms.max(0.0);
        self
    }

    /// Timing for validated settings
    pub fn from_settings(settings: &GameSettings) -> Self {
        Self::new(
            BASE_STEP_MS / settings.spin_intensity,
            settings.simulation_seconds * 1000.0,
        )
        .with_jitter(settings.step_jitter_ms as f64)
    }

    /// Finite, positive step and cutoff with a finite, non-negative jitter
    pub fn is_valid(&self) -> bool {
        self.step_duration_ms.is_finite()
            && self.step_duration_ms > 0.0
            && self.total_duration_ms.is_finite()
            && self.total_duration_ms > 0.0
            && self.step_jitter_ms.is_finite()
            && self.step_jitter_ms >= 0.0
    }

    /// Start delay of a column: `column * (total / columns / 4)`
    pub fn stagger_delay_ms(&self, column: usize, columns: usize) -> f64 {
        if columns == 0 {
            return 0.0;
        }
        column as f64 * (self.total_duration_ms / columns as f64 * STAGGER_FRACTION)
    }

    pub fn stagger_delay(&self, column: usize, columns: usize) -> Duration {
        millis(self.stagger_delay_ms(column, columns))
    }

    /// Delays for every column, in column order
    pub fn stagger_delays(&self, columns: usize) -> Vec<Duration> {
        (0..columns)
            .map(|c| self.stagger_delay(c, columns))
            .collect()
    }

    /// One step's duration, jittered by a draw from `rng`
    pub fn step_duration(&self, rng: &mut dyn RandomSource) -> Duration {
        let jitter = if self.step_jitter_ms > 0.0 {
            rng.next_double() * self.step_jitter_ms
        } else {
            0.0
        };
        millis(self.step_duration_ms + jitter)
    }

    pub fn total_duration(&self) -> Duration {
        millis(self.total_duration_ms)
    }
}

impl Default for SpinTiming {
    fn default() -> Self {
        Self::from_settings(&GameSettings::default())
    }
}

/// Saturates instead of panicking on overflow; NaN and negatives become zero
fn millis(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
}
