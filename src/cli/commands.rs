// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `plot`
// and all their configurable flags.
//
// Flag names keep their underscores (--hidden_size, --n_epochs)
// so existing run scripts keep working.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing or unknown values
//   - type conversion (string → usize, u64, enum)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::model_kind::ModelKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a handwriting network on strokes.json
    Train(TrainArgs),

    /// Render one raw dataset sample as an SVG image
    Plot(PlotArgs),
}

/// Which network to train. Anything else is rejected by clap.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArg {
    Prediction,
    Synthesis,
}

impl From<ModelArg> for ModelKind {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Prediction => ModelKind::Prediction,
            ModelArg::Synthesis  => ModelKind::Synthesis,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// LSTM hidden units per layer
    #[arg(long = "hidden_size", default_value_t = 400)]
    pub hidden_size: usize,

    /// Number of stacked LSTM layers
    #[arg(long = "n_layers", default_value_t = 3)]
    pub n_layers: usize,

    /// Sequences per mini-batch
    #[arg(long = "batch_size", default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long = "n_epochs", default_value_t = 100)]
    pub n_epochs: usize,

    /// Network to train
    #[arg(long, value_enum, default_value_t = ModelArg::Prediction)]
    pub model: ModelArg,

    /// Directory holding strokes.json (and sentences.txt)
    #[arg(long = "data_path", default_value = "./data/")]
    pub data_path: String,

    /// Load transcriptions even for the prediction network
    #[arg(long = "text_req")]
    pub text_req: bool,

    /// Train on a small subset with verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Seed for the split, the shuffle and weight initialisation
    #[arg(long, default_value_t = 212)]
    pub seed: u64,

    /// Where weights, config and metrics are written
    #[arg(long = "output_dir", default_value = "results")]
    pub output_dir: String,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            hidden_size: a.hidden_size,
            n_layers:    a.n_layers,
            batch_size:  a.batch_size,
            n_epochs:    a.n_epochs,
            model:       a.model.into(),
            data_path:   a.data_path,
            text_req:    a.text_req,
            debug:       a.debug,
            seed:        a.seed,
            output_dir:  a.output_dir,
        }
    }
}

/// All arguments for the `plot` command
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Directory holding strokes.json
    #[arg(long = "data_path", default_value = "./data/")]
    pub data_path: String,

    /// Which sample to draw
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    /// SVG file to write
    #[arg(long, default_value = "sample.svg")]
    pub output: PathBuf,
}
