//! blocklog CLI
//!
//! Command-line tools for blocklog flash images.
//!
//! # Commands
//!
//! - `init` - Create a zeroed flash image
//! - `write` - Append messages and commit them
//! - `read` - Read (and consume) messages
//! - `inspect` - Display block headers and recovered cursors
//! - `verify` - Check every live block for structural damage

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::{Geometry, OutputFormat};
use error::{CliError, CliResult};
use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// blocklog command-line flash image tools.
#[derive(Parser)]
#[command(name = "blocklog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the flash image
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Block size in bytes
    #[arg(global = true, short, long, default_value_t = 4096)]
    block_size: usize,

    /// Number of blocks (defaults to what the image holds, or 16 for init)
    #[arg(global = true, short = 'n', long)]
    blocks: Option<u32>,

    /// Largest message accepted by write
    #[arg(global = true, long)]
    max_msg_size: Option<usize>,

    /// Smallest part left at the end of a block
    #[arg(global = true, long)]
    min_part_size: Option<usize>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a zeroed flash image
    Init {
        /// Overwrite an existing image
        #[arg(short, long)]
        force: bool,
    },

    /// Append messages and commit them to flash
    Write {
        /// Messages to write, one per argument
        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// Read messages, invalidating blocks that are fully read
    Read {
        /// Maximum number of messages to read
        #[arg(short, long)]
        count: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Display block headers and recovered cursors
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Verify the structure of every live block
    Verify,

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if let CliError::Log(log_err) = &err {
                eprintln!("  code: {}", log_err.code());
            }
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let geometry = Geometry {
        block_size: cli.block_size,
        nr_blocks: cli.blocks,
        max_msg_size: cli.max_msg_size,
        min_part_size: cli.min_part_size,
    };

    match cli.command {
        Commands::Init { force } => {
            let path = cli.path.ok_or(CliError::MissingPath)?;
            commands::init::run(&path, &geometry, force)
        }
        Commands::Write { messages } => {
            let path = cli.path.ok_or(CliError::MissingPath)?;
            commands::write::run(&path, &geometry, &messages)
        }
        Commands::Read { count, format } => {
            let path = cli.path.ok_or(CliError::MissingPath)?;
            commands::read::run(&path, &geometry, count, format)
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or(CliError::MissingPath)?;
            commands::inspect::run(&path, &geometry, format)
        }
        Commands::Verify => {
            let path = cli.path.ok_or(CliError::MissingPath)?;
            commands::verify::run(&path, &geometry)
        }
        Commands::Version => {
            println!("blocklog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("blocklog core v{}", blocklog_core::VERSION);
            Ok(())
        }
    }
}
