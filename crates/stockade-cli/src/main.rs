//! # stockade: container manager
//!
//! Daemon-less front end over the Stockade runtime: each subcommand reads
//! and updates the on-disk container records, then exits.

use clap::Parser;
use stockade_cli::commands::{self, Cli};

fn main() -> anyhow::Result<()> {
    stockade_cli::init_logging();
    let cli = Cli::parse();
    commands::execute(cli)
}
