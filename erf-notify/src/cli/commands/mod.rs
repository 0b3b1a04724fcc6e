//! Subcommand handlers

pub mod config;
pub mod inspect;
pub mod run;
pub mod users;

pub use config::handle_config_command;
pub use inspect::handle_inspect_command;
pub use run::handle_run_command;
pub use users::handle_users_command;
