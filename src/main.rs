use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dfslice::{render, Criterion, OutputFormat, SliceDirection, Slicer};

/// Dataflow slicing for Python source.
#[derive(Parser)]
#[command(name = "dfslice", version, about)]
struct Cli {
    /// Slicing criterion: <file>:<line>:<variable>
    ///
    /// Example: main.py:42:result
    criterion: String,

    /// Slicing direction
    #[arg(short, long, value_enum, default_value = "both")]
    direction: SliceDirection,

    /// Output format
    #[arg(short, long, value_enum, default_value = "tree")]
    format: OutputFormat,

    /// Project root used to resolve imports and the criterion file
    #[arg(short = 'r', long, default_value = ".")]
    project_root: PathBuf,

    /// Disable cross-file analysis; calls into other files become leaves
    #[arg(long)]
    no_cross_file: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "dfslice=warn",
        1 => "dfslice=info",
        2 => "dfslice=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let criterion: Criterion = cli.criterion.parse()?;
    let slicer = Slicer::with_cross_file(&cli.project_root, !cli.no_cross_file);
    let result = slicer
        .slice(&criterion, cli.direction)
        .with_context(|| format!("slicing {criterion}"))?;

    let output = render::render(&result, cli.format)?;
    println!("{output}");
    Ok(())
}
