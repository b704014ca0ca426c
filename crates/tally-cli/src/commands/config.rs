use std::path::PathBuf;

use tally_core::util::normalize_text_option;
use tally_core::PeerId;

use crate::cli::ConfigCommands;
use crate::commands::common::AppContext;
use crate::config::{generate_device_id, CliConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            author,
            device_id,
            db_path,
        } => {
            let config = run_config_init(author, device_id, db_path, ctx)?;
            println!("Saved config to {}", ctx.config_path.display());
            if let Some(device_id) = &config.device_id {
                println!("Device id: {device_id}");
            }
            Ok(())
        }
        ConfigCommands::Show => run_config_show(ctx),
    }
}

/// Merge explicit values over the stored config and save it.
pub fn run_config_init(
    author: Option<String>,
    device_id: Option<String>,
    db_path: Option<PathBuf>,
    ctx: &AppContext,
) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::load_from_path(&ctx.config_path).map_err(CliError::Config)?;

    if let Some(author) = normalize_text_option(author) {
        config.author_name = Some(author);
    }

    if let Some(device_id) = normalize_text_option(device_id) {
        PeerId::new(device_id.as_str())?;
        config.device_id = Some(device_id);
    } else if config.device_id.is_none() {
        config.device_id = Some(generate_device_id());
    }

    if let Some(db_path) = db_path.filter(|path| !path.as_os_str().is_empty()) {
        config.db_path = Some(db_path);
    }

    config
        .save_to_path(&ctx.config_path)
        .map_err(CliError::Config)?;
    tracing::debug!(path = %ctx.config_path.display(), "Saved CLI config");
    Ok(config)
}

pub fn run_config_show(ctx: &AppContext) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    eprintln!("config: {}", ctx.config_path.display());
    eprintln!("database: {}", ctx.db_path.display());
    Ok(())
}
