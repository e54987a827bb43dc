// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "podscan")]
#[command(about = "QR join-code scanner for FlowPods groups")]
#[command(version = env!("GIT_VERSION"))]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full acquisition pipeline against an image source
    Scan {
        /// Image file standing in for the live camera
        input: PathBuf,

        /// Give up after this many seconds without a code
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Decode a single image and print any join code it contains
    Decode {
        /// Image file to decode
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=podscan=debug, RUST_LOG=info
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
        Commands::Scan { input, timeout } => cli::scan(input, timeout),
        Commands::Decode { input } => cli::decode_image(input),
    }
}
