// ============================================================
// Layer 5 — LSTM Cell
// ============================================================
// A single long short-term memory cell, stepped one timestep at
// a time. The synthesis network needs per-step control (its
// attention window feeds back into the next step), so both
// networks share this hand-stepped cell.
//
//   gates = W_x·x + W_h·h            → [i | f | g | o]
//   c'    = σ(f)⊙c + σ(i)⊙tanh(g)
//   h'    = σ(o)⊙tanh(c')
//
// Reference: Hochreiter & Schmidhuber (1997)
//            Graves (2013) Generating Sequences With RNNs, §2

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

#[derive(Config, Debug)]
pub struct LstmCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl LstmCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmCell<B> {
        LstmCell {
            input_gates:  LinearConfig::new(self.d_input, 4 * self.d_hidden).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, 4 * self.d_hidden)
                .with_bias(false)
                .init(device),
            d_hidden: self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub d_hidden:     usize,
}

/// Hidden and cell vectors of one LSTM layer, each [batch, d_hidden]
#[derive(Debug, Clone)]
pub struct LstmState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Tensor<B, 2>,
}

impl<B: Backend> LstmState<B> {
    pub fn zeros(batch_size: usize, d_hidden: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch_size, d_hidden], device),
            cell:   Tensor::zeros([batch_size, d_hidden], device),
        }
    }
}

impl<B: Backend> LstmCell<B> {
    pub fn zero_state(&self, batch_size: usize, device: &B::Device) -> LstmState<B> {
        LstmState::zeros(batch_size, self.d_hidden, device)
    }

    /// x: [batch, d_input] → next state
    pub fn step(&self, x: Tensor<B, 2>, state: LstmState<B>) -> LstmState<B> {
        let [batch_size, _] = x.dims();
        let h = self.d_hidden;

        let gates = self.input_gates.forward(x) + self.hidden_gates.forward(state.hidden);
        let gate = |k: usize| gates.clone().slice([0..batch_size, k * h..(k + 1) * h]);

        let input  = sigmoid(gate(0));
        let forget = sigmoid(gate(1));
        let update = tanh(gate(2));
        let output = sigmoid(gate(3));

        let cell   = forget * state.cell + input * update;
        let hidden = output * tanh(cell.clone());
        LstmState { hidden, cell }
    }

    /// xs: [batch, steps, d_input] → ([batch, steps, d_hidden], final state)
    pub fn forward_sequence(&self, xs: Tensor<B, 3>, state: LstmState<B>) -> (Tensor<B, 3>, LstmState<B>) {
        let [batch_size, steps, d_input] = xs.dims();

        let mut state   = state;
        let mut outputs = Vec::with_capacity(steps);
        for t in 0..steps {
            let x = xs.clone()
                .slice([0..batch_size, t..t + 1, 0..d_input])
                .reshape([batch_size, d_input]);
            state = self.step(x, state);
            outputs.push(state.hidden.clone());
        }

        (Tensor::stack(outputs, 1), state)
    }
}
