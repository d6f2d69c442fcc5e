// ============================================================
// Layer 3 — Model Variant
// ============================================================
// The two networks the trainer knows about. Stored in the saved
// TrainConfig so a checkpoint records which architecture it holds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Unconditional stroke prediction
    Prediction,
    /// Stroke synthesis conditioned on a character sequence
    Synthesis,
}

impl ModelKind {
    /// Synthesis cannot train without transcriptions
    pub fn requires_text(&self) -> bool {
        matches!(self, ModelKind::Synthesis)
    }
}
