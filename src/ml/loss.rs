// ============================================================
// Layer 5 — Mixture Density Loss
// ============================================================
// The network output at every step parameterises a distribution
// over the NEXT pen point (Graves 2013, §4.1):
//
//   ŷ = [ ê | π̂₁..π̂_M | μ1 | μ2 | log σ1 | log σ2 | ρ̂ ]
//
//   e   = sigmoid(ê)           probability the pen lifts
//   π   = softmax(π̂)           mixture weights
//   σ   = exp(log σ)           standard deviations
//   ρ   = tanh(ρ̂)              correlations
//
// Negative log-likelihood of a target (pen, x1, x2):
//
//   -log Σ_k π_k N(x1, x2 | μ_k, σ_k, ρ_k)
//   -[ pen·log e + (1 - pen)·log(1 - e) ]
//
// The mixture sum is evaluated with log-sum-exp for stability.
// Padded steps contribute nothing, and the sum is divided by the
// number of VALID steps only.

use burn::{
    prelude::*,
    tensor::activation::{log_sigmoid, log_softmax, tanh},
};

/// ln(2π)
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Floor for 1 - ρ² so |ρ| → 1 cannot produce log(0)
const MIN_ONE_MINUS_RHO_SQ: f64 = 1e-6;

/// Mixture parameters split out of the raw network output.
/// Every tensor is [batch, steps, M] except `eos_logit` ([.., 1]).
pub struct MixtureParams<B: Backend> {
    pub eos_logit: Tensor<B, 3>,
    pub log_pi:    Tensor<B, 3>,
    pub mu1:       Tensor<B, 3>,
    pub mu2:       Tensor<B, 3>,
    pub log_sigma1: Tensor<B, 3>,
    pub log_sigma2: Tensor<B, 3>,
    pub rho:       Tensor<B, 3>,
}

impl<B: Backend> MixtureParams<B> {
    pub fn from_output(y_hat: Tensor<B, 3>) -> Self {
        let [batch_size, steps, width] = y_hat.dims();
        let m = (width - 1) / 6;
        let part = |i: usize| {
            y_hat.clone().slice([0..batch_size, 0..steps, 1 + i * m..1 + (i + 1) * m])
        };

        Self {
            eos_logit:  y_hat.clone().slice([0..batch_size, 0..steps, 0..1]),
            log_pi:     log_softmax(part(0), 2),
            mu1:        part(1),
            mu2:        part(2),
            log_sigma1: part(3),
            log_sigma2: part(4),
            rho:        tanh(part(5)),
        }
    }

    /// log N_k(x1, x2) for every component: [batch, steps, M]
    pub fn log_density(&self, x1: Tensor<B, 3>, x2: Tensor<B, 3>) -> Tensor<B, 3> {
        let z1 = (x1 - self.mu1.clone()) / self.log_sigma1.clone().exp();
        let z2 = (x2 - self.mu2.clone()) / self.log_sigma2.clone().exp();

        let one_minus_rho_sq = (self.rho.clone().powf_scalar(2.0).neg() + 1.0)
            .clamp_min(MIN_ONE_MINUS_RHO_SQ);

        let z = z1.clone().powf_scalar(2.0)
            + z2.clone().powf_scalar(2.0)
            - z1 * z2 * self.rho.clone() * 2.0;

        let log_norm = self.log_sigma1.clone()
            + self.log_sigma2.clone()
            + one_minus_rho_sq.clone().log() * 0.5
            + LN_2PI;

        (z / (one_minus_rho_sq * 2.0) + log_norm).neg()
    }
}

/// log Σ exp(x) along the last dimension, kept as size 1
fn log_sum_exp<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let max = x.clone().max_dim(2).detach();
    (x - max.clone()).exp().sum_dim(2).log() + max
}

/// Per-step negative log-likelihood: [batch, steps]
pub fn step_nll<B: Backend>(targets: Tensor<B, 3>, y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch_size, steps, _] = targets.dims();
    let pen = targets.clone().slice([0..batch_size, 0..steps, 0..1]);
    let x1  = targets.clone().slice([0..batch_size, 0..steps, 1..2]);
    let x2  = targets.slice([0..batch_size, 0..steps, 2..3]);

    let params = MixtureParams::from_output(y_hat);

    let log_mixture = log_sum_exp(params.log_pi.clone() + params.log_density(x1, x2));

    let eos = params.eos_logit;
    let log_eos = pen.clone() * log_sigmoid(eos.clone())
        + (pen.neg() + 1.0) * log_sigmoid(eos.neg());

    (log_mixture + log_eos).neg().reshape([batch_size, steps])
}

/// Masked mean NLL over valid steps.
///
/// * `targets`: [batch, steps, 3]
/// * `y_hat`: [batch, steps, 1 + 6M]
/// * `mask`: [batch, steps], 1.0 for real steps
///
/// Returns a single-element tensor. A batch with no valid steps
/// has loss exactly zero.
pub fn mixture_density_loss<B: Backend>(
    targets: Tensor<B, 3>,
    y_hat:   Tensor<B, 3>,
    mask:    Tensor<B, 2>,
) -> Tensor<B, 1> {
    let nll = step_nll(targets, y_hat);

    // zero padded steps outright so a non-finite value there cannot leak in
    let padded = mask.clone().equal_elem(0.0);
    let nll = nll.mask_fill(padded, 0.0) * mask.clone();

    let valid_steps = mask.sum().clamp_min(1.0);
    nll.sum() / valid_steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_neutral_output_gives_closed_form_loss() {
        // ŷ = 0 → e = ½, uniform π, μ = 0, σ = 1, ρ = 0.
        // At target (0, 0, 0) the NLL is ln(2π) + ln 2 = ln(4π).
        let device = Default::default();
        let y_hat   = Tensor::<TestBackend, 3>::zeros([1, 4, 121], &device);
        let targets = Tensor::<TestBackend, 3>::zeros([1, 4, 3], &device);
        let mask    = Tensor::<TestBackend, 2>::ones([1, 4], &device);

        let loss = scalar(mixture_density_loss(targets, y_hat, mask));
        assert!((loss - (4.0 * std::f64::consts::PI).ln()).abs() < 1e-4);
    }

    #[test]
    fn test_padding_excluded_from_denominator() {
        // 2 sequences of 5 steps, masks [1,1,1,0,0] and [1,1,1,1,1]:
        // 8 valid steps, every one with the same NLL, so the mean
        // equals the single-step NLL. Dividing by 10 would give 0.8×.
        let device = Default::default();
        let y_hat   = Tensor::<TestBackend, 3>::zeros([2, 5, 121], &device);
        let targets = Tensor::<TestBackend, 3>::zeros([2, 5, 3], &device);
        let mask = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![1.0f32, 1., 1., 0., 0., 1., 1., 1., 1., 1.], [2, 5]),
            &device,
        );

        let loss = scalar(mixture_density_loss(targets, y_hat, mask));
        let per_step = (4.0 * std::f64::consts::PI).ln();
        assert!((loss - per_step).abs() < 1e-4);
        assert!((loss - 0.8 * per_step).abs() > 0.1);
    }

    #[test]
    fn test_fully_padded_batch_has_zero_loss() {
        let device = Default::default();
        let y_hat   = Tensor::<TestBackend, 3>::ones([2, 3, 121], &device) * 50.0;
        let targets = Tensor::<TestBackend, 3>::ones([2, 3, 3], &device);
        let mask    = Tensor::<TestBackend, 2>::zeros([2, 3], &device);

        assert_eq!(scalar(mixture_density_loss(targets, y_hat, mask)), 0.0);
    }

    #[test]
    fn test_pen_probability_matters() {
        // ê ≫ 0 predicts a lift: cheap when pen = 1, expensive when pen = 0
        let device = Default::default();
        let mut raw = vec![0.0f32; 121];
        raw[0] = 8.0;
        let y_hat = Tensor::<TestBackend, 3>::from_data(TensorData::new(raw, [1, 1, 121]), &device);
        let mask  = Tensor::<TestBackend, 2>::ones([1, 1], &device);

        let lift = Tensor::<TestBackend, 3>::from_data(TensorData::new(vec![1.0f32, 0., 0.], [1, 1, 3]), &device);
        let down = Tensor::<TestBackend, 3>::zeros([1, 1, 3], &device);

        let lift_loss = scalar(mixture_density_loss(lift, y_hat.clone(), mask.clone()));
        let down_loss = scalar(mixture_density_loss(down, y_hat, mask));
        assert!(lift_loss + 7.0 < down_loss);
    }
}
