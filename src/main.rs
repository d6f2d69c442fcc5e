use anyhow::Result;
use clap::Parser;
use handwriting_synth::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --debug on `train` turns the crate's own logs up to debug level
    let directive = if cli.debug_requested() {
        "handwriting_synth=debug"
    } else {
        "handwriting_synth=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse()?),
        )
        .init();

    cli.run()
}
