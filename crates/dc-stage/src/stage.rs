//! Stage: the semantic moments of a spin cycle

use serde::{Deserialize, Serialize};

/// Canonical spin stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpinStage {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Start command accepted
    SpinStart {
        columns: u32,
        /// Nominal duration before the cutoff (ms)
        total_duration_ms: u64,
    },

    /// A reel's stagger delay elapsed and it began stepping
    ReelStart { reel_index: usize },

    /// One reel advanced by one slot
    StepCompleted {
        reel_index: usize,
        /// New top symbol index after the shift
        top: usize,
        /// Index pushed onto the tail
        incoming: usize,
    },

    /// A reel's step update failed; the spin carries on
    StepFailed { reel_index: usize, reason: String },

    /// Nominal duration elapsed, no new steps begin
    Cutoff,

    /// Every reel has stopped and no step is in flight
    Quiesced,

    /// Result evaluated and published
    ResultReady {
        /// `None` when fewer than two columns are configured
        win: Option<bool>,
        message: String,
        tops: Vec<usize>,
    },

    /// `stop_all()` forced the reels to halt, nothing was evaluated
    Aborted,

    // ═══════════════════════════════════════════════════════════════════════
    // CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════
    /// Grid rebuilt after a settings change
    GridConfigured { columns: u32, rows: u32 },

    /// Symbol pool replaced
    SymbolsChanged { count: usize },
}

impl SpinStage {
    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        match self {
            SpinStage::SpinStart { .. } => "spin_start",
            SpinStage::ReelStart { .. } => "reel_start",
            SpinStage::StepCompleted { .. } => "step_completed",
            SpinStage::StepFailed { .. } => "step_failed",
            SpinStage::Cutoff => "cutoff",
            SpinStage::Quiesced => "quiesced",
            SpinStage::ResultReady { .. } => "result_ready",
            SpinStage::Aborted => "aborted",
            SpinStage::GridConfigured { .. } => "grid_configured",
            SpinStage::SymbolsChanged { .. } => "symbols_changed",
        }
    }

    /// Reel this stage refers to, if any
    pub fn reel_index(&self) -> Option<usize> {
        match self {
            SpinStage::ReelStart { reel_index }
            | SpinStage::StepCompleted { reel_index, .. }
            | SpinStage::StepFailed { reel_index, .. } => Some(*reel_index),
            _ => None,
        }
    }

    /// Does this stage end a spin cycle?
    pub fn is_terminal(&self) -> bool {
        matches!(self, SpinStage::ResultReady { .. } | SpinStage::Aborted)
    }
}
