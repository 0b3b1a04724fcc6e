//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::dispatch::Mode;

#[derive(Parser, Debug)]
#[command(
    name = "erf-notify",
    version,
    about = "Send consolidated ERF status-update emails from a spreadsheet export"
)]
pub struct Cli {
    /// Config file (defaults to <config dir>/erf-notify/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log lines to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build drafts from an ERF export, preview them and optionally send
    Run(RunArgs),
    /// Show how each sheet of a workbook scores as the data sheet
    Inspect(InspectArgs),
    /// Write the unique requesters to a mapping template workbook
    Users(UsersArgs),
    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// ERF export (.xlsx, .xlsm, .xlsb, .xls, .ods or .csv)
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t = RunMode::Preview)]
    pub mode: RunMode,

    /// Test recipient for demo mode (repeatable)
    #[arg(long = "demo-to", value_name = "ADDR")]
    pub demo_to: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write unresolved requesters to a workbook in this directory
    #[arg(long, value_name = "DIR")]
    pub export_unmapped: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct UsersArgs {
    pub file: PathBuf,

    /// Mapping template to write
    #[arg(short, long, default_value = "email_mapping.xlsx")]
    pub output: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Show what would be sent
    Preview,
    /// Send to the real requesters
    Send,
    /// Send the first few drafts to test recipients
    Demo,
}

impl From<RunMode> for Mode {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Preview => Mode::Preview,
            RunMode::Send => Mode::Send,
            RunMode::Demo => Mode::Demo,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "erf-notify",
            "--no-color",
            "run",
            "erf.xlsx",
            "--mode",
            "demo",
            "--demo-to",
            "a@example.com",
            "--demo-to",
            "b@example.com",
            "--format",
            "json",
        ])
        .unwrap();

        assert!(cli.no_color);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.file, PathBuf::from("erf.xlsx"));
        assert_eq!(Mode::from(args.mode), Mode::Demo);
        assert_eq!(args.demo_to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.yes);
    }

    #[test]
    fn test_defaults_and_global_flags() {
        let cli = Cli::try_parse_from(["erf-notify", "run", "erf.csv", "-v", "--config", "c.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode, RunMode::Preview);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["erf-notify", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init { force: true })
        ));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["erf-notify", "run", "x.xlsx", "--mode", "live"]).is_err());
    }
}
