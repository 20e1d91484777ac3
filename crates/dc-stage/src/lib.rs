//! # dc-stage - Spin lifecycle stages
//!
//! The reel engine never calls into rendering code. Instead it publishes
//! stages; a presentation layer subscribes and animates from them.
//!
//! ```text
//! SpinStart → ReelStart* → StepCompleted* → Cutoff → Quiesced → ResultReady
//!                                     └─ StepFailed (logged, non-fatal)
//! stop_all() at any point → Aborted
//! ```

pub mod event;
pub mod stage;

pub use event::*;
pub use stage::*;
