//! `users`: mapping template from the requesters of a data sheet

use anyhow::{Context, Result};
use colored::*;

use crate::cli::UsersArgs;
use crate::config::Config;
use crate::erf::{excel, group_by_requester};

pub fn handle_users_command(args: UsersArgs, config: &Config) -> Result<()> {
    let loaded = excel::load(&args.file, &config.columns, &config.loader)
        .with_context(|| format!("Failed to load ERF data from {}", args.file.display()))?;

    let mut users: Vec<String> = group_by_requester(loaded.records)
        .into_iter()
        .map(|g| g.requester)
        .collect();
    users.sort_by_key(|u| u.to_lowercase());

    if users.is_empty() {
        anyhow::bail!("No requesters found in sheet '{}'", loaded.sheet_name);
    }

    excel::write_mapping_template(&args.output, &users)?;
    println!(
        "Wrote {} requesters from '{}' to {}",
        users.len().to_string().green(),
        loaded.sheet_name,
        args.output.display().to_string().cyan()
    );
    println!("Fill in the Email column, then set resolver.mapping_file to this file.");
    Ok(())
}
