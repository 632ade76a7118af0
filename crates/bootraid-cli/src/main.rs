mod cli;
mod discover;
mod forge;
mod inspect;
mod stats;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Assemble(args) => discover::run_assemble(&args),
        Command::Read(args) => discover::run_read(&args),
        Command::Inspect(args) => inspect::run_inspect(&args),
        Command::Forge(args) => forge::run_forge(&args),
    }
}
