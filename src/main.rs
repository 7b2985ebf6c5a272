//! Scoped Memo CLI entry point.

use anyhow::Result;
use clap::Parser;

use scoped_memo::cli::commands;
use scoped_memo::cli::{Cli, Commands};
use scoped_memo::infrastructure::config::ConfigLoader;
use scoped_memo::infrastructure::logging::{LogConfig, LoggerImpl};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        scoped_memo::cli::handle_error(err, cli.json);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (config, source) = match cli.config {
        Some(ref path) => (ConfigLoader::load_from_file(path)?, path.display().to_string()),
        None => (ConfigLoader::load()?, "layered".to_string()),
    };

    // Keep the guard alive so buffered file output is flushed on exit.
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match cli.command {
        Commands::Config(ref args) => commands::config::execute(args, &config, &source, cli.json),
        Commands::Stress(ref args) => commands::stress::execute(args, &config, cli.json),
    }
}
