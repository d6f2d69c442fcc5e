use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::vocab::CharVocab;
use crate::domain::stroke::Handwriting;

/// One next-step training example.
///
/// `inputs[t]` is point t of the trajectory and `targets[t]` is
/// point t + 1, so the network always predicts the following offset.
/// `text` holds vocabulary ids when the sample has a transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandwritingSample {
    pub inputs:  Vec<[f32; 3]>,
    pub targets: Vec<[f32; 3]>,
    pub text:    Option<Vec<usize>>,
}

impl HandwritingSample {
    /// Returns None for trajectories too short to give a single step.
    pub fn from_handwriting(hw: &Handwriting, vocab: Option<&CharVocab>) -> Option<Self> {
        if hw.points.len() < 2 {
            return None;
        }
        let points: Vec<[f32; 3]> = hw.points.iter().map(|p| p.to_array()).collect();
        let text = match (vocab, &hw.text) {
            (Some(v), Some(t)) => Some(v.encode(t)),
            _ => None,
        };
        Some(Self {
            inputs:  points[..points.len() - 1].to_vec(),
            targets: points[1..].to_vec(),
            text,
        })
    }

    pub fn steps(&self) -> usize {
        self.inputs.len()
    }
}

pub struct HandwritingDataset {
    samples: Vec<HandwritingSample>,
}

impl HandwritingDataset {
    pub fn new(samples: Vec<HandwritingSample>) -> Self { Self { samples } }

    /// Convert raw handwriting, dropping samples with fewer than two points
    pub fn from_handwriting(items: &[Handwriting], vocab: Option<&CharVocab>) -> Self {
        let samples: Vec<_> = items
            .iter()
            .filter_map(|hw| HandwritingSample::from_handwriting(hw, vocab))
            .collect();
        let dropped = items.len() - samples.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} samples shorter than two points", dropped);
        }
        Self::new(samples)
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<HandwritingSample> for HandwritingDataset {
    fn get(&self, index: usize) -> Option<HandwritingSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stroke::StrokePoint;

    fn hw(n: usize, text: Option<&str>) -> Handwriting {
        Handwriting::new(
            (0..n).map(|i| StrokePoint::new(0.0, i as f32, 0.0)).collect(),
            text.map(str::to_string),
        )
    }

    #[test]
    fn test_targets_are_inputs_shifted_by_one() {
        let s = HandwritingSample::from_handwriting(&hw(4, None), None).unwrap();
        assert_eq!(s.steps(), 3);
        assert_eq!(s.inputs[1], s.targets[0]);
        assert_eq!(s.targets[2], [0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_text_encoded_only_with_vocab() {
        let vocab = CharVocab::build(["ab"]);
        let with = HandwritingSample::from_handwriting(&hw(3, Some("ba")), Some(&vocab)).unwrap();
        let without = HandwritingSample::from_handwriting(&hw(3, Some("ba")), None).unwrap();
        assert_eq!(with.text, Some(vec![1, 0]));
        assert_eq!(without.text, None);
    }

    #[test]
    fn test_short_samples_dropped() {
        let ds = HandwritingDataset::from_handwriting(&[hw(1, None), hw(5, None), hw(0, None)], None);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0).unwrap().steps(), 4);
    }
}
