//! Error taxonomy for the notification pipeline.
//!
//! Only [`LoadError`] and [`ConfigError`] abort a run. Row validation and
//! dispatch failures are recovered where they happen and surface as counts in
//! the run summary.

use std::path::PathBuf;

/// The source file could not be turned into a table of records.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file format '{extension}' (expected .xlsx, .xlsm, .xlsb, .xls, .ods or .csv)")]
    UnsupportedFormat { extension: String },

    #[error("Failed to open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("No sheet in {} contains the requester and status columns", .0.display())]
    NoDataSheet(PathBuf),

    #[error("Sheet '{sheet}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },
}

/// A single row that failed validation. The row is skipped; the load goes on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Row {row}{}: missing required fields: {}", requester_suffix(.requester), .missing.join(", "))]
pub struct RecordValidationError {
    pub row: usize,
    pub requester: Option<String>,
    pub missing: Vec<String>,
}

fn requester_suffix(requester: &Option<String>) -> String {
    match requester {
        Some(r) => format!(" (requester '{}')", r),
        None => String::new(),
    }
}

/// The mail client rejected one draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid recipient address '{recipient}': {reason}")]
    InvalidRecipient { recipient: String, reason: String },

    #[error("Invalid sender address '{sender}': {reason}")]
    InvalidSender { sender: String, reason: String },

    #[error("Failed to build message for {recipient}: {reason}")]
    Build { recipient: String, reason: String },

    #[error("Transport failed for {recipient}: {reason}")]
    Transport { recipient: String, reason: String },
}

impl DispatchError {
    /// Address the failed draft was meant for
    pub fn recipient(&self) -> &str {
        match self {
            DispatchError::InvalidRecipient { recipient, .. }
            | DispatchError::Build { recipient, .. }
            | DispatchError::Transport { recipient, .. } => recipient,
            DispatchError::InvalidSender { sender, .. } => sender,
        }
    }
}

/// The dispatch gate was driven out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Drafts must be previewed before confirmation")]
    NotPreviewed,

    #[error("Sending requires confirmation")]
    NotConfirmed,

    #[error("Preview mode never sends")]
    PreviewOnly,

    #[error("Drafts have already been dispatched")]
    AlreadyDispatched,
}

/// Configuration could not be read or is inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid {name} template {source}")]
    Template {
        name: String,
        #[source]
        source: crate::erf::compose::format::ParseError,
    },
}
