//! Error types for Dynamic Casino

use thiserror::Error;

/// Rejected configuration. Carries the offending value so the shell can
/// show it in a modal message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("column count must be between 1 and 10, got {0}")]
    Columns(u32),

    #[error("items per column must be between 3 and 20, got {0}")]
    ItemsPerColumn(u32),

    #[error("symbols to use must be 0 (all) or between 1 and 8, got {0}")]
    SymbolsToUse(u32),

    #[error("spin intensity must be above 0.01 and at most 10, got {0}")]
    SpinIntensity(f64),

    #[error("simulation duration must be between 0.5 and 30 seconds, got {0}")]
    SimulationSeconds(f64),

    #[error("step jitter must be at most 1000 ms, got {0}")]
    StepJitter(u64),
}

/// Failure while updating a single reel during one animation step.
///
/// Never aborts a spin: the coordinator logs it and keeps the other reels going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    #[error("reel {0} does not exist")]
    UnknownReel(usize),

    #[error("reel {0} has no step in flight")]
    NoStepInFlight(usize),

    #[error("reel {reel} drew index {index} outside pool of {pool_size}")]
    IndexOutOfPool {
        reel: usize,
        index: usize,
        pool_size: usize,
    },

    #[error("reel {0} window is empty")]
    EmptyWindow(usize),
}

/// Result type alias
pub type ConfigResult<T> = Result<T, ConfigError>;
