//! Tally CLI - record spending offline and sync the ledger with another device.

mod cli;
mod commands;
mod config;
mod error;


use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::add::run_add;
use crate::commands::common::{resolve_db_path, AppContext};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::merge::run_merge;
use crate::commands::sync::{run_sync_offer, run_sync_receive, run_sync_role, run_sync_status};
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().map_err(CliError::Config)?,
    };
    let config = CliConfig::load_from_path(&config_path).map_err(CliError::Config)?;
    let db_path = resolve_db_path(cli.db_path, &config)?;
    let ctx = AppContext {
        db_path,
        config_path,
        config,
    };

    match cli.command {
        Some(Commands::Add {
            amount,
            category,
            author,
            date,
        }) => {
            run_add(
                &amount,
                category.into(),
                author.as_deref(),
                date.as_deref(),
                &ctx,
            )?;
        }
        Some(Commands::List { limit, json }) => run_list(limit, json, &ctx)?,
        Some(Commands::Edit { id, fields }) => {
            run_edit(&id, &fields, &ctx)?;
        }
        Some(Commands::Delete { id }) => {
            run_delete(&id, &ctx)?;
        }
        Some(Commands::Merge {
            local,
            remote,
            previous,
            output,
        }) => {
            run_merge(&local, &remote, previous.as_deref(), output.as_deref())?;
        }
        Some(Commands::Sync { command }) => match command {
            SyncCommands::Offer { output } => run_sync_offer(output.as_deref(), &ctx)?,
            SyncCommands::Receive { payload, output } => {
                run_sync_receive(&payload, output.as_deref(), &ctx)?;
            }
            SyncCommands::Role { peer } => {
                run_sync_role(&peer, &ctx)?;
            }
            SyncCommands::Status { json } => run_sync_status(json, &ctx)?,
        },
        Some(Commands::Config { command }) => run_config(command, &ctx)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
