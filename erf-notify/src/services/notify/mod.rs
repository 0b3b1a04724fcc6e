//! Notification run orchestration
//!
//! Sequences load → filter → group → resolve/compose → preview → confirm →
//! send, and is the only place that carries state across stages.

pub mod summary;

pub use summary::{RunSummary, write_preview};

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;

use crate::config::Config;
use crate::dispatch::{Confirmer, DispatchGate, MailClient, Mode};
use crate::erf::excel::{self, unmapped_users_filename, write_unmapped_users};
use crate::erf::{
    Composer, Draft, EmailResolver, Group, Recipient, filter_by_status, group_by_requester,
    status_breakdown,
};
use crate::error::DispatchError;

/// Per-run choices that are not configuration
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    /// Demo recipients; falls back to `demo.recipients` from the config
    pub demo_recipients: Vec<String>,
    /// Directory for the unmapped users workbook
    pub export_unmapped: Option<PathBuf>,
    /// Timestamp stamped into bodies and export names
    pub generated_at: NaiveDateTime,
}

/// Build one draft per group. Render failures are logged and counted.
pub fn compose_drafts(
    groups: &[Group],
    composer: &Composer,
    resolver: &mut EmailResolver,
    summary: &mut RunSummary,
) -> Vec<Draft> {
    let mut drafts = Vec::with_capacity(groups.len());
    for group in groups {
        let recipient = resolver.resolve(&group.requester);
        match composer.compose(group, recipient) {
            Ok(draft) => {
                if draft.recipient == Recipient::Unresolved {
                    summary.unresolved += 1;
                }
                drafts.push(draft);
            }
            Err(e) => {
                log::error!("Failed to render email for {}: {}", group.requester, e);
                summary.failed += 1;
            }
        }
    }
    drafts
}

/// Run the whole pipeline for `path`.
///
/// `preview_out` receives the draft preview before any confirmation is
/// asked. `connect` is only called once sending has been confirmed.
pub fn run<M, F>(
    path: &Path,
    config: &Config,
    options: &RunOptions,
    preview_out: &mut dyn Write,
    confirmer: &mut dyn Confirmer,
    connect: F,
) -> Result<RunSummary>
where
    M: MailClient,
    F: FnOnce() -> Result<M, DispatchError>,
{
    let mut summary = RunSummary::new(options.mode);

    let demo_recipients = if options.demo_recipients.is_empty() {
        config.demo.recipients.clone()
    } else {
        options.demo_recipients.clone()
    };
    if options.mode == Mode::Demo && demo_recipients.is_empty() {
        bail!("Demo mode needs at least one test recipient (--demo-to or demo.recipients)");
    }

    // Template errors are configuration errors: fail before touching the file
    let composer = Composer::from_config(
        &config.templates,
        &config.filter.target_statuses,
        options.generated_at,
    )
    .context("Invalid email templates")?;

    let loaded = excel::load(path, &config.columns, &config.loader)
        .with_context(|| format!("Failed to load ERF data from {}", path.display()))?;
    summary.sheet_name = loaded.sheet_name.clone();
    summary.total_rows = loaded.total_rows;
    summary.loaded = loaded.records.len();
    summary.rejected = loaded.rejected.len();

    let outcome = filter_by_status(
        loaded.records,
        &config.filter.target_statuses,
        config.filter.unmatched,
    );
    summary.filtered = outcome.kept.len();
    summary.excluded = outcome.excluded_total();
    summary.status_breakdown = status_breakdown(&outcome.kept, &config.filter.target_statuses);
    summary.excluded_statuses = outcome.excluded;

    let groups = group_by_requester(outcome.kept);
    summary.groups = groups.len();

    let mut resolver = EmailResolver::from_config(&config.resolver);
    log::debug!("{} email mappings available", resolver.mapping_len());
    let drafts = compose_drafts(&groups, &composer, &mut resolver, &mut summary);
    summary.drafts = drafts.len();
    summary.resolver = resolver.stats();
    summary.unmapped_users = resolver.unmapped_users();

    write_preview(
        preview_out,
        &drafts,
        config.preview.limit,
        config.preview.excerpt_chars,
    )?;

    let mut gate = match options.mode {
        Mode::Demo => DispatchGate::demo(drafts, config.demo.limit, demo_recipients),
        mode => DispatchGate::new(mode, drafts),
    };
    summary.previewed = gate.preview().previewed;

    if options.mode != Mode::Preview {
        if gate.outgoing().is_empty() {
            log::warn!("Nothing to send");
        } else if gate.confirm(confirmer)? {
            let mut client = connect().context("Failed to set up mail client")?;
            gate.send(&mut client)?;
        }
    }

    let report = gate.into_report();
    summary.sent = report.sent;
    summary.failed += report.failed;
    summary.declined = report.declined;

    if let Some(dir) = &options.export_unmapped {
        if !summary.unmapped_users.is_empty() {
            let file = dir.join(unmapped_users_filename(
                &options.mode.to_string(),
                options.generated_at,
            ));
            write_unmapped_users(
                &file,
                &summary.unmapped_users,
                &options.mode.to_string(),
                options.generated_at,
            )?;
            summary.unmapped_export = Some(file);
        }
    }

    Ok(summary)
}
