//! SpinEvent: a stage occurrence with timing metadata

use serde::{Deserialize, Serialize};

use crate::stage::SpinStage;

/// A stage event with spin context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinEvent {
    /// The stage
    pub stage: SpinStage,

    /// Spin counter, 0 for events outside a spin (configuration)
    pub spin_id: u64,

    /// Milliseconds since the spin started
    pub elapsed_ms: f64,
}

impl SpinEvent {
    pub fn new(stage: SpinStage, spin_id: u64, elapsed_ms: f64) -> Self {
        Self {
            stage,
            spin_id,
            elapsed_ms,
        }
    }

    /// Event not tied to any spin
    pub fn configuration(stage: SpinStage) -> Self {
        Self::new(stage, 0, 0.0)
    }

    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
