// ============================================================
// Layer 5 — Gradient Clamping
// ============================================================
// Two separate elementwise clamps keep LSTM training stable
// (Graves 2013, §2):
//
//   1. Output clamp  — ∂loss/∂ŷ is clamped to [-100, 100] BEFORE it
//                      flows back into the network.
//   2. Param clamp   — after backprop, every parameter gradient
//                      element is clamped to [-10, 10].
//
// Both are value clamps, not norm clipping.
//
// The output clamp runs as two explicit backward passes instead
// of a gradient hook:
//
//   ŷ ──detach──► ŷ' ──loss──► backward ──► ∂loss/∂ŷ' ──clamp──► g
//   backward( Σ ŷ ⊙ g )   → parameter gradients through the net
//
// Since g is a constant, ∂(Σ ŷ⊙g)/∂θ = gᵀ·∂ŷ/∂θ, which is exactly
// the chain rule with the clamped output gradient substituted.

use burn::{
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::marker::PhantomData;

use crate::ml::loss::mixture_density_loss;

/// Bound on ∂loss/∂ŷ
pub const OUTPUT_GRAD_LIMIT: f64 = 100.0;

/// Bound on each parameter gradient element
pub const PARAM_GRAD_LIMIT: f64 = 10.0;

/// Loss plus the clamped gradient of the loss w.r.t. the raw output.
pub fn clamped_output_gradient<B: AutodiffBackend>(
    y_hat:   Tensor<B, 3>,
    targets: Tensor<B, 3>,
    mask:    Tensor<B, 2>,
    limit:   f64,
) -> (Tensor<B, 1>, Tensor<B::InnerBackend, 3>) {
    let output = y_hat.detach().require_grad();
    let loss   = mixture_density_loss(targets, output.clone(), mask);

    let grads = loss.backward();
    let grad = match output.grad(&grads) {
        Some(g) => g.clamp(-limit, limit),
        None => Tensor::zeros(output.dims(), &output.device()),
    };

    (loss, grad)
}

/// Masked loss and parameter gradients, with ∂loss/∂ŷ clamped
/// to ±`limit` before backpropagating into the network.
pub fn backward_with_output_clamp<B: AutodiffBackend>(
    y_hat:   Tensor<B, 3>,
    targets: Tensor<B, 3>,
    mask:    Tensor<B, 2>,
    limit:   f64,
) -> (Tensor<B, 1>, B::Gradients) {
    let (loss, output_grad) = clamped_output_gradient(y_hat.clone(), targets, mask, limit);
    let surrogate = (y_hat * Tensor::from_inner(output_grad)).sum();
    (loss, surrogate.backward())
}

// ─── Parameter clamp ──────────────────────────────────────────────────────────
/// Walks every float parameter of a module and clamps its gradient.
struct GradientValueClamp<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    limit: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradientValueClamp<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id.clone()) {
            self.grads
                .register::<B::InnerBackend, D>(id, grad.clamp(-self.limit, self.limit));
        }
    }
}

/// Clamp every gradient element of `module`'s parameters to ±`limit`.
pub fn clamp_parameter_gradients<B, M>(module: &M, grads: &mut GradientsParams, limit: f64)
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = GradientValueClamp::<B> { grads, limit, _backend: PhantomData };
    module.visit(&mut visitor);
}

/// Finds the largest |gradient| over a module's parameters.
struct MaxAbsGradient<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    max:   f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for MaxAbsGradient<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            let m = grad.abs().max().into_scalar().elem::<f64>();
            self.max = self.max.max(m);
        }
    }
}

pub fn max_abs_gradient<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = MaxAbsGradient::<B> { grads, max: 0.0, _backend: PhantomData };
    module.visit(&mut visitor);
    visitor.max
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::ml::model::StrokeModel;
    use crate::ml::prediction::PredictionNetConfig;

    type TestBackend = Autodiff<NdArray>;

    /// One step where the mixture is extremely narrow and far from the target,
    /// so the raw output gradient is huge.
    fn steep_case(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 3>, Tensor<TestBackend, 3>, Tensor<TestBackend, 2>) {
        let mut raw = vec![0.0f32; 121];
        for v in &mut raw[61..101] {
            *v = -8.0; // log σ
        }
        let y_hat   = Tensor::from_data(TensorData::new(raw, [1, 1, 121]), device);
        let targets = Tensor::from_data(TensorData::new(vec![0.0f32, 5.0, -5.0], [1, 1, 3]), device);
        let mask    = Tensor::ones([1, 1], device);
        (y_hat, targets, mask)
    }

    #[test]
    fn test_output_gradient_is_clamped() {
        let device = Default::default();
        let (y_hat, targets, mask) = steep_case(&device);

        let (_, grad) = clamped_output_gradient(y_hat, targets, mask, OUTPUT_GRAD_LIMIT);
        let values = grad.into_data().to_vec::<f32>().unwrap();

        assert!(values.iter().all(|v| v.abs() <= OUTPUT_GRAD_LIMIT as f32));
        // the limit is actually reached, so the clamp did something
        assert!(values.iter().any(|v| v.abs() == OUTPUT_GRAD_LIMIT as f32));
    }

    #[test]
    fn test_parameter_gradients_are_clamped() {
        let device = Default::default();
        let model = PredictionNetConfig::new()
            .with_hidden_size(4)
            .with_n_layers(2)
            .init::<TestBackend>(&device);

        let inputs = Tensor::<TestBackend, 3>::ones([1, 3, 3], &device);
        let targets = Tensor::<TestBackend, 3>::ones([1, 3, 3], &device) * 40.0;
        let mask = Tensor::<TestBackend, 2>::ones([1, 3], &device);

        let (y_hat, _) = model.forward(inputs, None, model.init_hidden(1, &device)).unwrap();
        // no output clamp here: let the raw gradient grow
        let loss = mixture_density_loss(targets, y_hat, mask) * 1.0e4;
        let mut grads = GradientsParams::from_grads(loss.backward(), &model);

        clamp_parameter_gradients(&model, &mut grads, PARAM_GRAD_LIMIT);
        let max = max_abs_gradient(&model, &grads);
        assert!(max <= PARAM_GRAD_LIMIT);
        assert!(max > 0.0);
    }

    #[test]
    fn test_surrogate_backward_reaches_parameters() {
        let device = Default::default();
        let model = PredictionNetConfig::new()
            .with_hidden_size(4)
            .with_n_layers(1)
            .init::<TestBackend>(&device);

        let inputs = Tensor::<TestBackend, 3>::ones([2, 4, 3], &device);
        let targets = Tensor::<TestBackend, 3>::ones([2, 4, 3], &device);
        let mask = Tensor::<TestBackend, 2>::ones([2, 4], &device);

        let (y_hat, _) = model.forward(inputs, None, model.init_hidden(2, &device)).unwrap();
        let (loss, grads) = backward_with_output_clamp(y_hat, targets, mask, OUTPUT_GRAD_LIMIT);
        let grads = GradientsParams::from_grads(grads, &model);

        assert!(loss.into_scalar().elem::<f64>().is_finite());
        assert!(max_abs_gradient(&model, &grads) > 0.0);
    }
}
