// ============================================================
// Layer 5 — Unconditional Prediction Network
// ============================================================
// A stack of LSTM layers with skip connections (Graves 2013,
// Fig. 1): every layer sees the raw input, layers above the first
// also see the layer below, and the output layer reads all of
// them at once.
//
//   x ──► LSTM₁ ──► LSTM₂ ──► LSTM₃
//   │       │  ▲      │  ▲      │
//   └───────┼──┴──────┼──┘      │
//           └─────────┴─────────┴──► Linear ──► ŷ [.., 121]

use anyhow::Result;
use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::ml::lstm::{LstmCell, LstmCellConfig, LstmState};
use crate::ml::model::{output_size, StrokeModel, TextConditioning};

#[derive(Config, Debug)]
pub struct PredictionNetConfig {
    #[config(default = 400)]
    pub hidden_size: usize,
    #[config(default = 3)]
    pub n_layers:    usize,
    #[config(default = 3)]
    pub input_size:  usize,
    #[config(default = 20)]
    pub n_mixtures:  usize,
}

impl PredictionNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PredictionNet<B> {
        let layers = (0..self.n_layers)
            .map(|i| {
                let d_input = if i == 0 { self.input_size } else { self.input_size + self.hidden_size };
                LstmCellConfig::new(d_input, self.hidden_size).init(device)
            })
            .collect();
        let output = LinearConfig::new(self.hidden_size * self.n_layers, output_size(self.n_mixtures))
            .init(device);
        PredictionNet { layers, output }
    }
}

#[derive(Module, Debug)]
pub struct PredictionNet<B: Backend> {
    pub layers: Vec<LstmCell<B>>,
    pub output: Linear<B>,
}

/// One LstmState per layer
#[derive(Debug, Clone)]
pub struct PredictionState<B: Backend> {
    pub layers: Vec<LstmState<B>>,
}

impl<B: Backend> StrokeModel<B> for PredictionNet<B> {
    type State = PredictionState<B>;

    fn supports_text_conditioning(&self) -> bool {
        false
    }

    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> PredictionState<B> {
        PredictionState {
            layers: self.layers.iter().map(|l| l.zero_state(batch_size, device)).collect(),
        }
    }

    fn forward(
        &self,
        inputs: Tensor<B, 3>,
        _text:  Option<TextConditioning<B>>,
        state:  PredictionState<B>,
    ) -> Result<(Tensor<B, 3>, PredictionState<B>)> {
        let mut outputs: Vec<Tensor<B, 3>> = Vec::with_capacity(self.layers.len());
        let mut next = Vec::with_capacity(self.layers.len());

        for (layer, layer_state) in self.layers.iter().zip(state.layers) {
            let x = match outputs.last() {
                None => inputs.clone(),
                Some(below) => Tensor::cat(vec![inputs.clone(), below.clone()], 2),
            };
            let (hs, s) = layer.forward_sequence(x, layer_state);
            outputs.push(hs);
            next.push(s);
        }

        let y_hat = self.output.forward(Tensor::cat(outputs, 2));
        Ok((y_hat, PredictionState { layers: next }))
    }
}
