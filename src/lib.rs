// ============================================================
// handwriting-synth: library root
// ============================================================
// Layers, outermost first:
//
//   cli          — Layer 1: argument parsing and dispatch
//   application  — Layer 2: train / plot workflows
//   domain       — Layer 3: plain stroke types and traits
//   data         — Layer 4: files → samples → tensor batches
//   ml           — Layer 5: networks, loss, training loop (Burn)
//   infra        — Layer 6: checkpoints, metrics, SVG output
//
// The binary in main.rs is a thin wrapper around `cli::Cli`.

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
