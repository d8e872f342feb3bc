// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "stopmotion")]
#[command(about = "Stop-motion capture pipeline demo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a reel from the synthetic frame source and save a package
    Capture {
        /// Number of frames to commit
        #[arg(short, long, default_value = "5")]
        frames: u32,

        /// Frame width in pixels
        #[arg(long, default_value = "320")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "240")]
        height: u32,

        /// Output package path (default: ./reel_TIMESTAMP.reel)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the contents of a saved package
    Inspect {
        /// Package directory to inspect
        package: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=stopmotion=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            frames,
            width,
            height,
            output,
        } => cli::capture(frames, width, height, output),
        Commands::Inspect { package } => cli::inspect(package),
    }
}
