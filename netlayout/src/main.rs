use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod check_cmd;
mod cli;
mod compile_cmd;
mod gather_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Gather(args) => gather_cmd::run_gather(args),
        Command::Compile(args) => compile_cmd::run_compile(args),
        Command::Check(args) => check_cmd::run_check(args),
    }
}
