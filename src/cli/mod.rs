// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains a prediction or synthesis network
//   2. `plot`  — draws one dataset sample as SVG
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PlotArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "handwriting-synth",
    version = "0.1.0",
    about = "Train recurrent mixture-density networks on online handwriting."
)]
pub struct Cli {
    /// The subcommand to run (train or plot)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `--debug` also raises the log level
    pub fn debug_requested(&self) -> bool {
        matches!(&self.command, Commands::Train(args) if args.debug)
    }

    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Plot(args)  => run_plot(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting {:?} training on data in: {}", args.model, args.data_path);
    let output_dir = args.output_dir.clone();

    // Convert CLI args → application config (separates presentation from domain)
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Model saved in '{}'.", output_dir);
    Ok(())
}

fn run_plot(args: PlotArgs) -> Result<()> {
    use crate::application::plot_use_case::PlotUseCase;

    let use_case = PlotUseCase::new(args.data_path, args.index, args.output.clone());
    if use_case.execute()? {
        println!("Saved plot to '{}'.", args.output.display());
    }
    Ok(())
}
