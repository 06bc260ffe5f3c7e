mod commands;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::pipeline::StitchArgs;

#[derive(Parser)]
#[command(name = "stitch", about = "Stitches a grid of overlapping tile images into a mosaic")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    args: StitchArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::pipeline::build_config(&cli.args)?;

    stitch_core::pipeline::prepare_output_dir(&config.output_dirpath, config.overwrite_output)?;

    let log_path = config.output_dirpath.join(format!("{}log.txt", config.output_prefix));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    commands::pipeline::run(&config)
}
