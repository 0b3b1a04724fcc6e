mod cli;
mod config;
mod dispatch;
mod erf;
mod error;
mod services;

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use cli::commands::{
    handle_config_command, handle_inspect_command, handle_run_command, handle_users_command,
};
use cli::{Cli, Commands, ConfigCommands};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env is optional
    dotenvy::dotenv().ok();

    init_logging(cli.verbose, cli.log_file.as_deref())?;

    // lettre's rustls transport needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => handle_run_command(args, &load_config(config_path)?),
        Commands::Inspect(args) => handle_inspect_command(args, &load_config(config_path)?),
        Commands::Users(args) => handle_users_command(args, &load_config(config_path)?),
        Commands::Config(ConfigCommands::Show) => {
            handle_config_command(ConfigCommands::Show, config_path, &load_config(config_path)?)
        }
        // path and init must work even when the existing file is broken
        Commands::Config(command) => handle_config_command(command, config_path, &Config::default()),
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if verbose {
        builder.filter_module("erf_notify", LevelFilter::Debug);
    }

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
