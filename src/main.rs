//! # Repository Mirror CLI
//!
//! Binary entry point for the `repo-mirror` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging and output configuration.
//! - Handling top-level application errors and translating them into
//!   user-friendly output.
//!
//! The core application logic lives in the library crate; the binary is a
//! thin wrapper around it.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
