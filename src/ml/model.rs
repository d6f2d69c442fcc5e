// ============================================================
// Layer 5 — Stroke Model Capability Trait
// ============================================================
// The training loop never asks "which network is this?". It asks
// the model what it can do:
//
//   supports_text_conditioning()  → does forward need text?
//   init_hidden(batch, device)    → fresh recurrent state
//   forward(inputs, text, state)  → mixture parameters + state
//
// Both PredictionNet and SynthesisNet implement this trait for
// every Burn backend, so the same loop drives either one on the
// autodiff backend (training) and the inner backend (validation).

use anyhow::Result;
use burn::prelude::*;

/// Number of Gaussian components in the output mixture
pub const DEFAULT_MIXTURES: usize = 20;

/// One end-of-stroke logit plus (π, μ1, μ2, σ1, σ2, ρ) per component.
/// With 20 components this is the classic 121-wide output.
pub fn output_size(n_mixtures: usize) -> usize {
    1 + 6 * n_mixtures
}

/// Transcription tensors consumed by a text-conditioned model
#[derive(Debug, Clone)]
pub struct TextConditioning<B: Backend> {
    /// One-hot characters: [batch, text_len, vocab_size]
    pub text: Tensor<B, 3>,
    /// 1.0 for real characters: [batch, text_len]
    pub text_mask: Tensor<B, 2>,
}

pub trait StrokeModel<B: Backend> {
    /// Recurrent state threaded through one batch and then dropped
    type State;

    fn supports_text_conditioning(&self) -> bool;

    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> Self::State;

    /// inputs: [batch, steps, 3] → predictions: [batch, steps, output_size]
    fn forward(
        &self,
        inputs: Tensor<B, 3>,
        text:   Option<TextConditioning<B>>,
        state:  Self::State,
    ) -> Result<(Tensor<B, 3>, Self::State)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_is_121_wide() {
        assert_eq!(output_size(DEFAULT_MIXTURES), 121);
    }
}
