mod balances;
mod cli;
mod db;
mod error;
mod fmt;
mod lunchmoney;
mod mapper;
mod models;
mod money;
mod providers;
mod reconciler;
mod repository;
mod settings;
#[cfg(test)]
mod testutil;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lunchsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = settings::load_settings().and_then(|mut settings| {
        let command = cli.command.unwrap_or(Commands::Repl);
        cli::dispatch(command, &mut settings)
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
