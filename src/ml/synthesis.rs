// ============================================================
// Layer 5 — Text-Conditioned Synthesis Network
// ============================================================
// Graves (2013) §5: the first LSTM layer drives a soft attention
// "window" that slides along the transcription. At every step:
//
//   (α̂, β̂, κ̂) = W·h₁                      K triples
//   α = exp(α̂), β = exp(β̂), κ = κ_prev + exp(κ̂)
//   φ(u) = Σ_k α_k · exp(-β_k (κ_k - u)²)   weight of character u
//   w    = Σ_u φ(u) · onehot(c_u)            window vector
//
// κ only ever grows, so the window moves forward through the
// text as the pen writes. The window is fed to the upper layers
// at this step and to the first layer at the next step:
//
//   LSTM₁ ← [x_t, w_{t-1}]
//   LSTMₖ ← [x_t, w_t, h_{k-1}]       k > 1
//   ŷ_t   = Linear([h₁, …, h_N])

use anyhow::{bail, Result};
use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::ml::lstm::{LstmCell, LstmCellConfig, LstmState};
use crate::ml::model::{output_size, StrokeModel, TextConditioning};

#[derive(Config, Debug)]
pub struct SynthesisNetConfig {
    /// Characters in the vocabulary; the window vector width
    pub vocab_size: usize,
    #[config(default = 400)]
    pub hidden_size: usize,
    #[config(default = 3)]
    pub n_layers: usize,
    #[config(default = 3)]
    pub input_size: usize,
    #[config(default = 20)]
    pub n_mixtures: usize,
    /// K, the number of Gaussians in the attention window
    #[config(default = 10)]
    pub n_window_gaussians: usize,
}

impl SynthesisNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SynthesisNet<B> {
        let first = LstmCellConfig::new(self.input_size + self.vocab_size, self.hidden_size).init(device);
        let upper = (1..self.n_layers.max(1))
            .map(|_| {
                LstmCellConfig::new(self.input_size + self.vocab_size + self.hidden_size, self.hidden_size)
                    .init(device)
            })
            .collect();
        let window = LinearConfig::new(self.hidden_size, 3 * self.n_window_gaussians).init(device);
        let output = LinearConfig::new(self.hidden_size * self.n_layers.max(1), output_size(self.n_mixtures))
            .init(device);

        SynthesisNet {
            first,
            upper,
            window,
            output,
            vocab_size: self.vocab_size,
            n_window_gaussians: self.n_window_gaussians,
        }
    }
}

#[derive(Module, Debug)]
pub struct SynthesisNet<B: Backend> {
    pub first:  LstmCell<B>,
    pub upper:  Vec<LstmCell<B>>,
    pub window: Linear<B>,
    pub output: Linear<B>,
    pub vocab_size: usize,
    pub n_window_gaussians: usize,
}

#[derive(Debug, Clone)]
pub struct SynthesisState<B: Backend> {
    /// First layer followed by the upper layers
    pub layers: Vec<LstmState<B>>,
    /// Window vector of the previous step: [batch, vocab_size]
    pub window: Tensor<B, 2>,
    /// Window positions: [batch, K]
    pub kappa: Tensor<B, 2>,
}

/// Output of one attention step
pub struct Attention<B: Backend> {
    pub window: Tensor<B, 2>,
    pub kappa:  Tensor<B, 2>,
    /// Character weights: [batch, text_len]
    pub phi:    Tensor<B, 2>,
}

impl<B: Backend> SynthesisNet<B> {
    /// Slide the window one step given the first layer's hidden state.
    pub fn attend(
        &self,
        hidden: Tensor<B, 2>,
        kappa:  Tensor<B, 2>,
        text:   &TextConditioning<B>,
    ) -> Attention<B> {
        let [batch_size, _] = hidden.dims();
        let [_, text_len, _] = text.text.dims();
        let k = self.n_window_gaussians;

        let params = self.window.forward(hidden).exp();
        let alpha = params.clone().slice([0..batch_size, 0..k]);
        let beta  = params.clone().slice([0..batch_size, k..2 * k]);
        let kappa = kappa + params.slice([0..batch_size, 2 * k..3 * k]);

        // character positions u = 0..text_len: [1, 1, text_len]
        let positions = Tensor::<B, 1, Int>::arange(0..text_len as i64, &kappa.device())
            .float()
            .reshape([1, 1, text_len]);

        // [batch, K, text_len]
        let distance = (kappa.clone().unsqueeze_dim::<3>(2) - positions).powf_scalar(2.0);
        let weights  = alpha.unsqueeze_dim::<3>(2) * (beta.unsqueeze_dim::<3>(2).neg() * distance).exp();

        // Σ over K, padding characters get zero weight: [batch, 1, text_len]
        let phi = weights.sum_dim(1) * text.text_mask.clone().unsqueeze_dim::<3>(1);

        let window = phi.clone()
            .matmul(text.text.clone())
            .reshape([batch_size, self.vocab_size]);

        Attention { window, kappa, phi: phi.reshape([batch_size, text_len]) }
    }

    fn step_input(x: &Tensor<B, 2>, window: &Tensor<B, 2>) -> Tensor<B, 2> {
        Tensor::cat(vec![x.clone(), window.clone()], 1)
    }
}

impl<B: Backend> StrokeModel<B> for SynthesisNet<B> {
    type State = SynthesisState<B>;

    fn supports_text_conditioning(&self) -> bool {
        true
    }

    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> SynthesisState<B> {
        let layers = std::iter::once(&self.first)
            .chain(&self.upper)
            .map(|l| l.zero_state(batch_size, device))
            .collect();
        SynthesisState {
            layers,
            window: Tensor::zeros([batch_size, self.vocab_size], device),
            kappa:  Tensor::zeros([batch_size, self.n_window_gaussians], device),
        }
    }

    fn forward(
        &self,
        inputs: Tensor<B, 3>,
        text:   Option<TextConditioning<B>>,
        state:  SynthesisState<B>,
    ) -> Result<(Tensor<B, 3>, SynthesisState<B>)> {
        let Some(text) = text else {
            bail!("synthesis network needs text conditioning for every batch");
        };
        let [batch_size, steps, d_input] = inputs.dims();

        let SynthesisState { mut layers, mut window, mut kappa } = state;
        let mut outputs = Vec::with_capacity(steps);

        for t in 0..steps {
            let x = inputs.clone()
                .slice([0..batch_size, t..t + 1, 0..d_input])
                .reshape([batch_size, d_input]);

            let mut previous = layers.into_iter();
            let mut next = Vec::with_capacity(self.upper.len() + 1);

            let first_state = match previous.next() {
                Some(s) => s,
                None => bail!("synthesis state has no layers"),
            };
            let first = self.first.step(Self::step_input(&x, &window), first_state);

            let attention = self.attend(first.hidden.clone(), kappa, &text);
            window = attention.window;
            kappa  = attention.kappa;

            let mut below = first.hidden.clone();
            let mut hiddens = vec![below.clone()];
            next.push(first);

            for (cell, s) in self.upper.iter().zip(previous) {
                let layer_input = Tensor::cat(vec![x.clone(), window.clone(), below], 1);
                let s = cell.step(layer_input, s);
                below = s.hidden.clone();
                hiddens.push(below.clone());
                next.push(s);
            }

            outputs.push(Tensor::cat(hiddens, 1));
            layers = next;
        }

        let y_hat = self.output.forward(Tensor::stack(outputs, 1));
        Ok((y_hat, SynthesisState { layers, window, kappa }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small(vocab: usize) -> SynthesisNetConfig {
        SynthesisNetConfig::new(vocab).with_hidden_size(8).with_n_layers(2)
    }

    fn text(device: &<TestBackend as Backend>::Device) -> TextConditioning<TestBackend> {
        // two characters then one padding slot, vocab of 4
        let one_hot = vec![
            1.0f32, 0., 0., 0.,
            0., 0., 1., 0.,
            0., 0., 0., 0.,
        ];
        TextConditioning {
            text:      Tensor::from_data(TensorData::new(one_hot, [1, 3, 4]), device),
            text_mask: Tensor::from_data(TensorData::new(vec![1.0f32, 1.0, 0.0], [1, 3]), device),
        }
    }

    #[test]
    fn test_forward_shape_and_state() {
        let device = Default::default();
        let model = small(4).init::<TestBackend>(&device);
        let inputs = Tensor::<TestBackend, 3>::zeros([1, 5, 3], &device);

        let state = model.init_hidden(1, &device);
        let (y_hat, state) = model.forward(inputs, Some(text(&device)), state).unwrap();
        assert_eq!(y_hat.dims(), [1, 5, 121]);
        assert_eq!(state.layers.len(), 2);
        assert_eq!(state.window.dims(), [1, 4]);
        assert_eq!(state.kappa.dims(), [1, 10]);
    }

    #[test]
    fn test_missing_text_is_an_error() {
        let device = Default::default();
        let model = small(4).init::<TestBackend>(&device);
        let inputs = Tensor::<TestBackend, 3>::zeros([1, 2, 3], &device);

        assert!(model.supports_text_conditioning());
        assert!(model.forward(inputs, None, model.init_hidden(1, &device)).is_err());
    }

    #[test]
    fn test_window_ignores_padding_and_kappa_advances() {
        let device = Default::default();
        let model = small(4).init::<TestBackend>(&device);
        let hidden = Tensor::<TestBackend, 2>::zeros([1, 8], &device);
        let kappa  = Tensor::<TestBackend, 2>::zeros([1, 10], &device);

        let att = model.attend(hidden, kappa, &text(&device));

        let phi = att.phi.into_data().to_vec::<f32>().unwrap();
        assert_eq!(phi[2], 0.0);
        let window = att.window.into_data().to_vec::<f32>().unwrap();
        // only characters 0 and 2 appear in the text
        assert_eq!(window[1], 0.0);
        assert_eq!(window[3], 0.0);
        assert!((window[0] - phi[0]).abs() < 1e-6);

        let kappa = att.kappa.into_data().to_vec::<f32>().unwrap();
        assert!(kappa.iter().all(|&k| k > 0.0));
    }
}
