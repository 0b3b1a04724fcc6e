//! `config`: locate, show and create the config file

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::*;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn handle_config_command(
    command: ConfigCommands,
    explicit: Option<&Path>,
    config: &Config,
) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            let path = config_path(explicit)?;
            let state = if path.exists() {
                "exists".green()
            } else {
                "not created".yellow()
            };
            println!("{} ({})", path.display(), state);
        }
        ConfigCommands::Show => {
            let toml = config.to_toml().context("Failed to format configuration")?;
            print!("{}", toml);
        }
        ConfigCommands::Init { force } => {
            let path = config_path(explicit)?;
            init_config(&path, force)?;
            println!("Wrote default configuration to {}", path.display().to_string().cyan());
        }
    }
    Ok(())
}

fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => Config::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the config directory")),
    }
}

/// Write the default configuration to `path`
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let toml = Config::default()
        .to_toml()
        .context("Failed to format default configuration")?;
    fs::write(path, toml)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    log::info!("Created config file {}", path.display());
    Ok(())
}
