use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mlog_cli::commands::{days, location, record, status};
use mlog_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match command {
        Commands::Start { kind } => record::start(&mut stdout, &config, (*kind).into())?,
        Commands::Switch { kind } => {
            record::switch(&mut stdout, &config, kind.map(Into::into))?;
        }
        Commands::End => record::end(&mut stdout, &config)?,
        Commands::Save => record::save(&mut stdout, &config)?,
        Commands::Discard => record::discard(&mut stdout, &config)?,
        Commands::Location { lat, lon } => location::run(&mut stdout, &config, *lat, *lon)?,
        Commands::Track => location::track(io::stdin().lock(), &mut stdout, &config)?,
        Commands::Status { json } => status::run(&mut stdout, &config, *json)?,
        Commands::Days { from, until, json } => {
            days::run(&mut stdout, &config, *from, *until, *json)?;
        }
    }

    Ok(())
}
