// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The networks, their loss and the loop that trains them.
//
//   lstm.rs       — LSTM cell with explicit state, stepped one
//                   timestep at a time or run over a sequence
//
//   model.rs      — StrokeModel: the interface the training loop
//                   drives. A model reports whether it consumes
//                   text conditioning, builds its own initial
//                   hidden state, and maps input offsets to
//                   mixture-density parameters.
//
//   prediction.rs — Unconditional network: stacked LSTMs with
//                   skip connections and a mixture-density head
//
//   synthesis.rs  — Text-conditioned network: adds a Gaussian
//                   attention window over the one-hot transcription
//
//   loss.rs       — Bivariate Gaussian mixture + Bernoulli pen
//                   likelihood, masked over padded timesteps
//
//   gradient.rs   — Output-gradient clamp (±100) and parameter
//                   gradient clamp (±10)
//
//   trainer.rs    — train_epoch / validate / train and the
//                   WGPU entry point
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Graves (2013) Generating Sequences With Recurrent
//            Neural Networks

/// LSTM cell with explicit hidden / cell state
pub mod lstm;

/// StrokeModel trait shared by both networks
pub mod model;

/// Unconditional handwriting prediction network
pub mod prediction;

/// Text-conditioned handwriting synthesis network
pub mod synthesis;

/// Masked mixture-density negative log-likelihood
pub mod loss;

/// Gradient clamping helpers
pub mod gradient;

/// Training and validation loop
pub mod trainer;
