// ============================================================
// Layer 4 — Offset Normaliser
// ============================================================
// Pen offsets in raw handwriting data span very different
// ranges per writer. Before training, every dx and dy is
// standardised with statistics fitted on the TRAINING split:
//
//   dx' = (dx - mean_x) / std_x
//   dy' = (dy - mean_y) / std_y
//
// The same statistics are applied to the validation split so
// both sets live in the same coordinate space. Pen-up flags
// are never touched.

use serde::{Deserialize, Serialize};

use crate::domain::stroke::Handwriting;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetStats {
    pub mean: [f32; 2],
    pub std:  [f32; 2],
}

impl Default for OffsetStats {
    fn default() -> Self {
        Self { mean: [0.0, 0.0], std: [1.0, 1.0] }
    }
}

impl OffsetStats {
    /// Mean and population standard deviation of dx / dy over
    /// every point of every sample.
    pub fn fit(samples: &[Handwriting]) -> Self {
        let count: usize = samples.iter().map(|s| s.points.len()).sum();
        if count == 0 {
            return Self::default();
        }
        let n = count as f64;

        let mut sum = [0.0f64; 2];
        for p in samples.iter().flat_map(|s| &s.points) {
            sum[0] += p.dx as f64;
            sum[1] += p.dy as f64;
        }
        let mean = [sum[0] / n, sum[1] / n];

        let mut sq = [0.0f64; 2];
        for p in samples.iter().flat_map(|s| &s.points) {
            sq[0] += (p.dx as f64 - mean[0]).powi(2);
            sq[1] += (p.dy as f64 - mean[1]).powi(2);
        }
        let std = sq.map(|s| {
            let s = (s / n).sqrt();
            // constant offsets would divide by zero
            if s > f64::EPSILON { s as f32 } else { 1.0 }
        });

        Self { mean: [mean[0] as f32, mean[1] as f32], std }
    }

    pub fn normalize(&self, sample: &mut Handwriting) {
        for p in &mut sample.points {
            p.dx = (p.dx - self.mean[0]) / self.std[0];
            p.dy = (p.dy - self.mean[1]) / self.std[1];
        }
    }

    pub fn normalize_all(&self, samples: &mut [Handwriting]) {
        samples.iter_mut().for_each(|s| self.normalize(s));
    }

    pub fn denormalize(&self, sample: &mut Handwriting) {
        for p in &mut sample.points {
            p.dx = p.dx * self.std[0] + self.mean[0];
            p.dy = p.dy * self.std[1] + self.mean[1];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stroke::StrokePoint;

    fn sample(offsets: &[(f32, f32)]) -> Handwriting {
        Handwriting::new(
            offsets.iter().map(|&(dx, dy)| StrokePoint::new(0.0, dx, dy)).collect(),
            None,
        )
    }

    #[test]
    fn test_fit_mean_and_std() {
        let stats = OffsetStats::fit(&[sample(&[(1.0, 10.0), (3.0, 10.0)])]);
        assert_eq!(stats.mean, [2.0, 10.0]);
        assert_eq!(stats.std[0], 1.0);
        // dy is constant → std falls back to 1
        assert_eq!(stats.std[1], 1.0);
    }

    #[test]
    fn test_normalize_then_denormalize_restores_offsets() {
        let original = sample(&[(1.0, -4.0), (5.0, 2.0), (-3.0, 8.0)]);
        let stats = OffsetStats::fit(std::slice::from_ref(&original));

        let mut s = original.clone();
        stats.normalize(&mut s);
        let mean_dx: f32 = s.points.iter().map(|p| p.dx).sum::<f32>() / 3.0;
        assert!(mean_dx.abs() < 1e-5);

        stats.denormalize(&mut s);
        for (a, b) in s.points.iter().zip(&original.points) {
            assert!((a.dx - b.dx).abs() < 1e-4);
            assert!((a.dy - b.dy).abs() < 1e-4);
        }
    }

    #[test]
    fn test_pen_flags_untouched() {
        let mut s = Handwriting::new(vec![StrokePoint::new(1.0, 4.0, 4.0)], None);
        OffsetStats { mean: [1.0, 1.0], std: [2.0, 2.0] }.normalize(&mut s);
        assert_eq!(s.points[0], StrokePoint::new(1.0, 1.5, 1.5));
    }

    #[test]
    fn test_empty_corpus_is_identity() {
        assert_eq!(OffsetStats::fit(&[]), OffsetStats::default());
    }
}
