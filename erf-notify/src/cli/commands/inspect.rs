//! `inspect`: per-sheet data-sheet analysis

use anyhow::{Context, Result};
use colored::*;

use crate::cli::{InspectArgs, OutputFormat};
use crate::config::Config;
use crate::erf::excel::{self, SheetAnalysis, select_best};

pub fn handle_inspect_command(args: InspectArgs, config: &Config) -> Result<()> {
    let analyses = excel::inspect(&args.file, &config.columns)
        .with_context(|| format!("Failed to inspect {}", args.file.display()))?;
    let selected = select_best(&analyses);

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "file": args.file,
                "sheets": analyses,
                "selected": selected.map(|i| analyses[i].name.clone()),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", format!("Sheets in {}", args.file.display()).bold());
            for (i, analysis) in analyses.iter().enumerate() {
                print_analysis(analysis, selected == Some(i));
            }
            println!();
            match selected {
                Some(i) => println!("Data sheet: {}", analyses[i].name.bright_green().bold()),
                None => println!("{}", "No usable data sheet found".red()),
            }
        }
    }
    Ok(())
}

fn print_analysis(analysis: &SheetAnalysis, selected: bool) {
    let marker = if selected { "*".green().bold() } else { " ".normal() };
    println!();
    println!(
        "{} {} ({} rows, {} columns)",
        marker,
        analysis.name.bold(),
        analysis.data_rows,
        analysis.columns
    );

    if let Some(reason) = analysis.rejection() {
        println!("    {} {}", "skipped:".red(), reason);
        return;
    }

    println!("    score: {}/{}", analysis.score, analysis.max_score);
    if !analysis.missing_required.is_empty() {
        println!(
            "    {} {}",
            "missing required:".red(),
            analysis.missing_required.join(", ")
        );
    }
    if !analysis.missing_expected.is_empty() {
        println!(
            "    {} {}",
            "missing expected:".yellow(),
            analysis.missing_expected.join(", ")
        );
    }
}
