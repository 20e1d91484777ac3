//! Reel strip: one column's symbol window and step state machine
//!
//! The strip is pure data. It knows nothing about time: the coordinator
//! decides when a step begins and ends, and renderers read the window and
//! scroll progress.
//!
//! ```text
//!            start()            begin_step()
//!   Idle ───────────► Spinning ─────────────► Spinning + step in flight
//!    ▲                   │  ▲                      │
//!    │ finish()/stop()   │  └──── complete_step() ─┘
//!    └───────────────────┘
//! ```

use std::collections::VecDeque;

use dc_core::{RandomSource, StepFailure, VISIBLE_SLOTS};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityCounter, ActivityGuard};

/// Reel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReelState {
    /// Not spinning
    Idle,
    /// Stepping
    Spinning,
    /// Forced stop aligning to a slot boundary
    Stopping,
}

/// Identifies one step; invalidated by [`ReelStrip::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTicket {
    reel_index: usize,
    generation: u64,
}

/// Data change produced by a completed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub reel_index: usize,
    /// Index dropped from the top
    pub removed: usize,
    /// Index appended at the tail
    pub incoming: usize,
    /// New top after the shift
    pub top: usize,
}

/// How a forced stop resolved a step in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopAlignment {
    /// No step was in flight
    AtRest,
    /// Less than half a slot scrolled, the window snapped back
    SnappedBack,
    /// Half a slot or more scrolled, the incoming symbol was committed
    Committed,
}

/// One column of the slot machine
pub struct ReelStrip {
    index: usize,
    window: VecDeque<usize>,
    pool_size: usize,
    state: ReelState,
    /// Symbol scrolling in during the current step
    pending: Option<usize>,
    /// Scroll progress within the current slot, 0.0..=1.0
    progress: f64,
    /// Bumped by every forced stop
    generation: u64,
    steps_completed: u64,
    activity: ActivityCounter,
}

impl ReelStrip {
    /// Create a reel with a random window of `items` indices
    pub fn new(index: usize, items: usize, pool_size: usize, rng: &mut dyn RandomSource) -> Self {
        let mut reel = Self {
            index,
            window: VecDeque::new(),
            pool_size,
            state: ReelState::Idle,
            pending: None,
            progress: 0.0,
            generation: 0,
            steps_completed: 0,
            activity: ActivityCounter::new(),
        };
        reel.rebuild(items, pool_size, rng);
        reel
    }

    /// Refill the window after a configuration or symbol change.
    ///
    /// An empty pool leaves the window empty.
    pub fn rebuild(&mut self, items: usize, pool_size: usize, rng: &mut dyn RandomSource) {
        self.stop();
        self.pool_size = pool_size;
        self.window.clear();
        if pool_size == 0 {
            return;
        }
        let items = items.max(VISIBLE_SLOTS);
        self.window.extend((0..items).map(|_| rng.next_int(pool_size)));
    }

    /// Enter `Spinning`. No-op returning false when the pool is empty.
    pub fn start(&mut self) -> bool {
        if self.pool_size == 0 || self.window.is_empty() {
            return false;
        }
        if self.state == ReelState::Idle {
            self.state = ReelState::Spinning;
        }
        self.state == ReelState::Spinning
    }

    /// Begin one step: count it as in flight, then draw the incoming index.
    ///
    /// Returns `None` when the reel is not spinning, a step is already in
    /// flight, or the pool is empty.
    pub fn begin_step(&mut self, rng: &mut dyn RandomSource) -> Option<(StepTicket, ActivityGuard)> {
        if self.state != ReelState::Spinning || self.pending.is_some() || self.pool_size == 0 {
            return None;
        }
        let guard = self.activity.begin();
        self.pending = Some(rng.next_int(self.pool_size));
        self.progress = 0.0;
        Some((
            StepTicket {
                reel_index: self.index,
                generation: self.generation,
            },
            guard,
        ))
    }

    /// Record visual scroll progress of the step in flight
    pub fn set_progress(&mut self, fraction: f64) {
        if self.pending.is_some() {
            self.progress = fraction.clamp(0.0, 1.0);
        }
    }

    /// Finish a step: pop the top, push the incoming index.
    ///
    /// `Ok(None)` means the step was discarded by a forced stop.
    pub fn complete_step(&mut self, ticket: StepTicket) -> Result<Option<StepOutcome>, StepFailure> {
        if ticket.reel_index != self.index {
            return Err(StepFailure::UnknownReel(ticket.reel_index));
        }
        if ticket.generation != self.generation {
            return Ok(None);
        }
        let incoming = self
            .pending
            .take()
            .ok_or(StepFailure::NoStepInFlight(self.index))?;
        self.progress = 0.0;
        self.shift(incoming).map(Some)
    }

    fn shift(&mut self, incoming: usize) -> Result<StepOutcome, StepFailure> {
        if incoming >= self.pool_size {
            return Err(StepFailure::IndexOutOfPool {
                reel: self.index,
                index: incoming,
                pool_size: self.pool_size,
            });
        }
        let removed = self
            .window
            .pop_front()
            .ok_or(StepFailure::EmptyWindow(self.index))?;
        self.window.push_back(incoming);
        self.steps_completed += 1;

        let top = self.window.front().copied().unwrap_or(incoming);
        Ok(StepOutcome {
            reel_index: self.index,
            removed,
            incoming,
            top,
        })
    }

    /// Graceful end after the cutoff; the last step has already completed
    pub fn finish(&mut self) {
        if self.pending.is_none() {
            self.state = ReelState::Idle;
        }
    }

    /// Halt immediately and align to the nearest slot boundary.
    ///
    /// Afterwards the reel is idle and its in-flight counter is zero.
    pub fn stop(&mut self) -> StopAlignment {
        self.state = ReelState::Stopping;

        let alignment = match self.pending.take() {
            None => StopAlignment::AtRest,
            Some(incoming) if self.progress >= 0.5 => match self.shift(incoming) {
                Ok(_) => StopAlignment::Committed,
                Err(e) => {
                    log::warn!("Reel {} could not commit on stop: {}", self.index, e);
                    StopAlignment::SnappedBack
                }
            },
            Some(_) => StopAlignment::SnappedBack,
        };

        self.progress = 0.0;
        self.generation += 1;
        self.activity.reset();
        self.state = ReelState::Idle;
        alignment
    }

    /// Index in evaluation position
    pub fn current_top(&self) -> Option<usize> {
        self.window.front().copied()
    }

    /// Indices in the visible slots, top first
    pub fn visible(&self) -> Vec<usize> {
        self.window.iter().take(VISIBLE_SLOTS).copied().collect()
    }

    pub fn window(&self) -> &VecDeque<usize> {
        &self.window
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> ReelState {
        self.state
    }

    pub fn is_spinning(&self) -> bool {
        self.state == ReelState::Spinning
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    /// Steps of this reel currently in flight (0 or 1)
    pub fn in_flight(&self) -> usize {
        self.activity.in_flight()
    }

    pub fn activity(&self) -> &ActivityCounter {
        &self.activity
    }

    /// Shrink the pool under a running reel so the next landing step fails
    #[cfg(test)]
    pub(crate) fn set_pool_size(&mut self, pool_size: usize) {
        self.pool_size = pool_size;
    }
}

impl std::fmt::Debug for ReelStrip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelStrip")
            .field("index", &self.index)
            .field("window", &self.window)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
