//! `run`: the full load → preview → confirm → send pipeline

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use is_terminal::IsTerminal;

use crate::cli::{OutputFormat, RunArgs};
use crate::config::Config;
use crate::dispatch::{AutoConfirm, Confirmer, Mode, PromptConfirm, mailer};
use crate::erf::resolve::is_email;
use crate::services::notify::{self, RunOptions};

const MAX_DEMO_RECIPIENTS: usize = 3;

pub fn handle_run_command(args: RunArgs, config: &Config) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Input file does not exist: {}", args.file.display());
    }

    let mode = Mode::from(args.mode);
    let mut demo_recipients = args.demo_to.clone();
    for addr in &demo_recipients {
        if !is_email(addr) {
            anyhow::bail!("Not an email address: {}", addr);
        }
    }
    if mode == Mode::Demo && demo_recipients.is_empty() && config.demo.recipients.is_empty() {
        demo_recipients = prompt_demo_recipients()?;
    }

    let options = RunOptions {
        mode,
        demo_recipients,
        export_unmapped: args.export_unmapped.clone(),
        generated_at: Local::now().naive_local(),
    };

    let mut confirmer: Box<dyn Confirmer> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(PromptConfirm)
    };

    log::info!(
        "Processing {} in {} mode",
        args.file.display(),
        mode.to_string().to_uppercase()
    );

    // Keep stdout clean for JSON
    let mut preview_out: Box<dyn Write> = match args.format {
        OutputFormat::Text => Box::new(io::stdout()),
        OutputFormat::Json => Box::new(io::stderr()),
    };

    let summary = notify::run(
        &args.file,
        config,
        &options,
        &mut preview_out,
        confirmer.as_mut(),
        || mailer::from_config(&config.mail),
    )?;

    match args.format {
        OutputFormat::Text => {
            let mut stdout = io::stdout();
            summary.write_text(&mut stdout)?;
            if summary.declined {
                println!("{}", "No emails were sent.".yellow());
            }
        }
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }
    Ok(())
}

/// Ask for up to three test addresses on the terminal
fn prompt_demo_recipients() -> Result<Vec<String>> {
    if !io::stdin().is_terminal() {
        anyhow::bail!("Demo mode needs --demo-to when not running in a terminal");
    }

    println!("{}", "Demo mode: enter up to 3 test recipients (empty line to finish)".cyan());
    let mut recipients = Vec::new();
    while recipients.len() < MAX_DEMO_RECIPIENTS {
        let input: String = dialoguer::Input::new()
            .with_prompt(format!("Test email {}", recipients.len() + 1))
            .allow_empty(true)
            .validate_with(|s: &String| -> Result<(), String> {
                if s.trim().is_empty() || is_email(s.trim()) {
                    Ok(())
                } else {
                    Err("not a valid email address".to_string())
                }
            })
            .interact_text()
            .context("Failed to read test recipient")?;

        let addr = input.trim();
        if addr.is_empty() {
            break;
        }
        recipients.push(addr.to_string());
    }

    if recipients.is_empty() {
        anyhow::bail!("Demo mode needs at least one test recipient");
    }
    Ok(recipients)
}
