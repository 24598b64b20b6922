use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dtr_cli::commands::{active, export, member, report, scan, status};
use dtr_cli::{Cli, Commands, Config, ExportTarget};
use dtr_engine::Engine;

/// Load config and open the engine, ensuring the parent directory exists.
fn open_engine(config_path: Option<&Path>) -> Result<(Engine, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = dtr_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((Engine::new(db), config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Scan { member_id, json }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            scan::run(&mut stdout, &engine, member_id, *json)?;
        }
        Some(Commands::Member { action }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            member::run(&mut stdout, &engine, action)?;
        }
        Some(Commands::Report { start, end, json }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            report::run(&mut stdout, &engine, *start, *end, *json)?;
        }
        Some(Commands::Active { json }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            active::run(&mut stdout, &engine, *json)?;
        }
        Some(Commands::Export { target }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            match target {
                ExportTarget::Dtr { start, end, output } => {
                    export::run_dtr(&mut stdout, &engine, *start, *end, output.clone())?;
                }
                ExportTarget::Roster { output } => {
                    export::run_roster(&mut stdout, &engine, output.clone())?;
                }
            }
        }
        Some(Commands::Status) => {
            let (engine, config) = open_engine(cli.config.as_deref())?;
            status::run(&mut stdout, &engine, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
