// ============================================================
// Layer 4 — Stroke Batcher
// ============================================================
// Implements Burn's Batcher trait to turn Vec<HandwritingSample>
// into padded tensors on the configured device.
//
// Handwriting samples have different lengths, so padding is
// dynamic: every sequence is padded with zeros up to the longest
// one in THIS batch, and the mask records which steps are real.
//
//   sample 1: ■ ■ ■ □ □      mask: 1 1 1 0 0
//   sample 2: ■ ■ ■ ■ ■      mask: 1 1 1 1 1
//
// Transcriptions are padded the same way and one-hot encoded
// over the character vocabulary:
//
//   text:      [batch, text_len, vocab_size]
//   text_mask: [batch, text_len]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::HandwritingSample;

// ─── StrokeBatch ──────────────────────────────────────────────────────────────
/// A batch of handwriting samples. All tensors have batch_size
/// as their first dimension.
#[derive(Debug, Clone)]
pub struct StrokeBatch<B: Backend> {
    /// Input points shape: [batch_size, steps, 3]
    pub inputs: Tensor<B, 3>,

    /// Next-step points shape: [batch_size, steps, 3]
    pub targets: Tensor<B, 3>,

    /// 1.0 for real steps, 0.0 for padding shape: [batch_size, steps]
    pub mask: Tensor<B, 2>,

    /// One-hot transcriptions shape: [batch_size, text_len, vocab_size]
    pub text: Option<Tensor<B, 3>>,

    /// 1.0 for real characters shape: [batch_size, text_len]
    pub text_mask: Option<Tensor<B, 2>>,
}

impl<B: Backend> StrokeBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.inputs.dims()[0]
    }

    /// Move every tensor to `device` (no-op when already there)
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            inputs:    self.inputs.to_device(device),
            targets:   self.targets.to_device(device),
            mask:      self.mask.to_device(device),
            text:      self.text.map(|t| t.to_device(device)),
            text_mask: self.text_mask.map(|m| m.to_device(device)),
        }
    }
}

// ─── StrokeBatcher ────────────────────────────────────────────────────────────
/// Holds the target device, and the vocabulary size when the
/// batches should carry one-hot text.
#[derive(Clone, Debug)]
pub struct StrokeBatcher<B: Backend> {
    pub device:     B::Device,
    pub vocab_size: Option<usize>,
}

impl<B: Backend> StrokeBatcher<B> {
    pub fn new(device: B::Device, vocab_size: Option<usize>) -> Self {
        Self { device, vocab_size }
    }

    fn strokes(&self, items: &[HandwritingSample], steps: usize) -> (Tensor<B, 3>, Tensor<B, 3>, Tensor<B, 2>) {
        let batch_size = items.len();
        let mut inputs  = vec![0.0f32; batch_size * steps * 3];
        let mut targets = vec![0.0f32; batch_size * steps * 3];
        let mut mask    = vec![0.0f32; batch_size * steps];

        for (i, s) in items.iter().enumerate() {
            for (t, (x, y)) in s.inputs.iter().zip(&s.targets).enumerate() {
                let at = (i * steps + t) * 3;
                inputs[at..at + 3].copy_from_slice(x);
                targets[at..at + 3].copy_from_slice(y);
                mask[i * steps + t] = 1.0;
            }
        }

        let shape = [batch_size, steps, 3];
        (
            Tensor::from_data(TensorData::new(inputs, shape), &self.device),
            Tensor::from_data(TensorData::new(targets, shape), &self.device),
            Tensor::from_data(TensorData::new(mask, [batch_size, steps]), &self.device),
        )
    }

    /// None unless every sample in the batch has a transcription
    fn text(&self, items: &[HandwritingSample]) -> Option<(Tensor<B, 3>, Tensor<B, 2>)> {
        let vocab_size = self.vocab_size?;
        let texts: Vec<&Vec<usize>> = items.iter().map(|s| s.text.as_ref()).collect::<Option<_>>()?;

        let batch_size = items.len();
        // keep at least one column so an all-empty batch still has a valid shape
        let text_len = texts.iter().map(|t| t.len()).max().unwrap_or(0).max(1);

        let mut one_hot = vec![0.0f32; batch_size * text_len * vocab_size];
        let mut mask    = vec![0.0f32; batch_size * text_len];
        for (i, ids) in texts.iter().enumerate() {
            for (u, &id) in ids.iter().enumerate().filter(|&(_, &id)| id < vocab_size) {
                one_hot[(i * text_len + u) * vocab_size + id] = 1.0;
                mask[i * text_len + u] = 1.0;
            }
        }

        Some((
            Tensor::from_data(TensorData::new(one_hot, [batch_size, text_len, vocab_size]), &self.device),
            Tensor::from_data(TensorData::new(mask, [batch_size, text_len]), &self.device),
        ))
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<HandwritingSample, StrokeBatch<B>> for StrokeBatcher<B> {
    fn batch(&self, items: Vec<HandwritingSample>) -> StrokeBatch<B> {
        let steps = items.iter().map(HandwritingSample::steps).max().unwrap_or(0).max(1);

        let (inputs, targets, mask) = self.strokes(&items, steps);
        let (text, text_mask) = match self.text(&items) {
            Some((t, m)) => (Some(t), Some(m)),
            None => (None, None),
        };

        StrokeBatch { inputs, targets, mask, text, text_mask }
    }
}
