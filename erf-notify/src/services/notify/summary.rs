//! Run summary and draft preview output

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use crate::dispatch::Mode;
use crate::erf::{Draft, Recipient, ResolverStats};

/// Everything a run did, stage by stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: Mode,
    pub sheet_name: String,
    /// Non-empty data rows in the sheet
    pub total_rows: usize,
    pub loaded: usize,
    pub rejected: usize,
    /// Records with a target status
    pub filtered: usize,
    pub excluded: usize,
    pub groups: usize,
    pub drafts: usize,
    pub unresolved: usize,
    pub previewed: usize,
    pub sent: usize,
    /// Render failures plus send failures
    pub failed: usize,
    pub declined: bool,
    pub status_breakdown: BTreeMap<String, usize>,
    pub excluded_statuses: BTreeMap<String, usize>,
    pub resolver: ResolverStats,
    pub unmapped_users: Vec<String>,
    pub unmapped_export: Option<PathBuf>,
}

impl RunSummary {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            sheet_name: String::new(),
            total_rows: 0,
            loaded: 0,
            rejected: 0,
            filtered: 0,
            excluded: 0,
            groups: 0,
            drafts: 0,
            unresolved: 0,
            previewed: 0,
            sent: 0,
            failed: 0,
            declined: false,
            status_breakdown: BTreeMap::new(),
            excluded_statuses: BTreeMap::new(),
            resolver: ResolverStats::default(),
            unmapped_users: Vec::new(),
            unmapped_export: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to format JSON summary")
    }

    /// Human-readable summary
    pub fn write_text(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "PROCESSING SUMMARY".bold())?;
        writeln!(out, "{}", "=".repeat(50))?;
        writeln!(out, "Mode:               {}", self.mode.to_string().cyan())?;
        writeln!(out, "Sheet:              {}", self.sheet_name)?;
        writeln!(out, "Rows in sheet:      {}", self.total_rows)?;
        writeln!(out, "Loaded:             {}", self.loaded)?;
        if self.rejected > 0 {
            writeln!(out, "Rejected:           {}", self.rejected.to_string().yellow())?;
        }
        writeln!(out, "Target status rows: {}", self.filtered)?;
        writeln!(out, "Other statuses:     {}", self.excluded)?;
        for (status, count) in &self.status_breakdown {
            writeln!(out, "  • {}: {}", status, count)?;
        }
        writeln!(out, "Requesters:         {}", self.groups)?;
        writeln!(out, "Drafts:             {}", self.drafts)?;
        writeln!(
            out,
            "Email resolution:   {} resolved ({} mapped, {} partial, {} fallback, {} direct), {} failed",
            self.resolver.resolved(),
            self.resolver.mapped,
            self.resolver.partial,
            self.resolver.fallback,
            self.resolver.direct,
            self.resolver.failed
        )?;

        match self.mode {
            Mode::Preview => {
                writeln!(out, "Would send:         {}", self.previewed.to_string().green())?;
            }
            _ if self.declined => {
                writeln!(out, "Sending:            {}", "cancelled".yellow())?;
            }
            _ => {
                writeln!(out, "Sent:               {}", self.sent.to_string().green())?;
            }
        }
        if self.failed > 0 {
            writeln!(out, "Failed:             {}", self.failed.to_string().red())?;
        }

        if !self.unmapped_users.is_empty() {
            writeln!(
                out,
                "Unresolved:         {} ({})",
                self.unresolved.to_string().yellow(),
                self.unmapped_users.join(", ")
            )?;
        }
        if let Some(path) = &self.unmapped_export {
            writeln!(out, "Unmapped users written to {}", path.display())?;
        }
        Ok(())
    }
}

/// Show the first `limit` drafts with a body excerpt
pub fn write_preview(
    out: &mut dyn Write,
    drafts: &[Draft],
    limit: usize,
    excerpt_chars: usize,
) -> Result<()> {
    if drafts.is_empty() {
        writeln!(out, "No drafts to preview")?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "{}",
        format!("EMAIL PREVIEW ({} of {})", limit.min(drafts.len()), drafts.len()).bold()
    )?;

    for (i, draft) in drafts.iter().take(limit).enumerate() {
        writeln!(out, "{}", "-".repeat(50))?;
        writeln!(out, "#{} {}", i + 1, draft.requester.bright_white().bold())?;
        match &draft.recipient {
            Recipient::Address(to) => writeln!(out, "To:      {}", to.green())?,
            Recipient::Unresolved => writeln!(out, "To:      {}", "Email not found".red())?,
        }
        writeln!(out, "Subject: {}", draft.subject)?;
        writeln!(out, "Items:   {}", draft.item_count)?;
        writeln!(out)?;
        writeln!(out, "{}", draft.body_excerpt(excerpt_chars).dimmed())?;
    }

    if drafts.len() > limit {
        writeln!(out, "{}", "-".repeat(50))?;
        writeln!(out, "... and {} more", drafts.len() - limit)?;
    }
    Ok(())
}
