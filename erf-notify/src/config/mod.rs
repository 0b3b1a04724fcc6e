//! Configuration for erf-notify
//!
//! Loaded once at startup from a TOML file and passed by value into each
//! pipeline stage. Every section has defaults matching the standard ERF
//! report export, so an empty file (or none at all) is a working setup.

mod templates;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::erf::BodyFormat;
use crate::error::ConfigError;

pub use templates::{DEFAULT_BODY, DEFAULT_HTML_BODY, DEFAULT_HTML_ITEM, DEFAULT_ITEM};

const APP_DIR: &str = "erf-notify";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub columns: ColumnConfig,
    pub loader: LoaderConfig,
    pub filter: FilterConfig,
    pub templates: TemplateConfig,
    pub resolver: ResolverConfig,
    pub mail: MailConfig,
    pub demo: DemoConfig,
    pub preview: PreviewConfig,
}

/// Maps sheet headers onto record fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub requester: String,
    pub status: String,
    pub item: Option<String>,
    pub quantity: Option<String>,
    pub reference: Option<String>,
    /// Additional columns: logical name -> header
    pub extra: BTreeMap<String, String>,
    /// Headers that must exist besides requester and status
    pub required: Vec<String>,
    /// Headers that are only reported when missing
    pub expected: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        let extra = [
            ("plant", "Plnt"),
            ("ship_to_plant", "Ship-To-Plant"),
            ("line", "Item"),
            ("material", "Material"),
            ("unit", "Unit"),
            ("end", "END"),
            ("due_date", "PO Due Date"),
            ("expeditor", "Expeditor"),
            ("expeditor_status", "Expeditor Status"),
            ("remarks", "Expeditor Remarks"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            requester: "Entered by".to_string(),
            status: "ERF Sched Line Status".to_string(),
            item: Some("Material Description".to_string()),
            quantity: Some("ERF Itm Qty".to_string()),
            reference: Some("ERF Nr".to_string()),
            extra,
            required: Vec::new(),
            expected: [
                "Plnt",
                "Ship-To-Plant",
                "ERF Nr",
                "Item",
                "Material",
                "Material Description",
                "Unit",
                "ERF Itm Qty",
                "END",
                "PO Due Date",
                "Expeditor",
                "Expeditor Status",
                "Expeditor Remarks",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ColumnConfig {
    /// Columns a sheet must have to be considered at all
    pub fn critical(&self) -> Vec<&str> {
        vec![self.requester.as_str(), self.status.as_str()]
    }

    /// Critical columns, configured required ones and the headers behind
    /// `required_fields`, deduplicated
    pub fn required_columns<'a>(&'a self, required_fields: &'a [String]) -> Vec<&'a str> {
        let mut cols = self.critical();
        let field_headers = required_fields.iter().filter_map(|f| self.header_for(f));
        for c in self.required.iter().map(|s| s.as_str()).chain(field_headers) {
            if !cols.contains(&c) {
                cols.push(c);
            }
        }
        cols
    }

    /// Header for a logical field name, if mapped
    pub fn header_for(&self, field: &str) -> Option<&str> {
        match field {
            "requester" => Some(&self.requester),
            "status" => Some(&self.status),
            "item" => self.item.as_deref(),
            "quantity" => self.quantity.as_deref(),
            "reference" => self.reference.as_deref(),
            other => self.extra.get(other).map(|s| s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Use this sheet instead of auto-detecting the data sheet
    pub sheet: Option<String>,
    /// Logical fields that must be non-empty in every row
    pub required_fields: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sheet: None,
            required_fields: vec!["requester".to_string(), "status".to_string()],
        }
    }
}

/// What to do with rows whose status is not a target status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedStatusPolicy {
    /// Debug log only
    Ignore,
    /// One warning per distinct status with its row count
    #[default]
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub target_statuses: Vec<String>,
    pub unmatched: UnmatchedStatusPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            target_statuses: vec!["On order".to_string(), "Received".to_string()],
            unmatched: UnmatchedStatusPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub format: BodyFormat,
    pub subject: String,
    /// Falls back to the built-in body for `format` when unset
    pub body: Option<String>,
    /// Falls back to the built-in item line for `format` when unset
    pub item: Option<String>,
    pub item_separator: String,
    pub summary_line: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            format: BodyFormat::Text,
            subject: "ERF Status Update - ${item_count} Items".to_string(),
            body: None,
            item: None,
            item_separator: "\n".to_string(),
            summary_line: "• Items ${status}: ${count}".to_string(),
        }
    }
}

impl TemplateConfig {
    pub fn body_source(&self) -> &str {
        match (&self.body, self.format) {
            (Some(body), _) => body,
            (None, BodyFormat::Text) => DEFAULT_BODY,
            (None, BodyFormat::Html) => DEFAULT_HTML_BODY,
        }
    }

    pub fn item_source(&self) -> &str {
        match (&self.item, self.format) {
            (Some(item), _) => item,
            (None, BodyFormat::Text) => DEFAULT_ITEM,
            (None, BodyFormat::Html) => DEFAULT_HTML_ITEM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Workbook or CSV mapping requester ids to email addresses
    pub mapping_file: Option<PathBuf>,
    /// Accept a mapping id that contains the requester (or vice versa)
    pub partial_match: bool,
    /// Build `<requester>@<domain>` when nothing else matches
    pub fallback_domain: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mapping_file: None,
            partial_match: true,
            fallback_domain: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Smtp,
    /// Write .eml files into a directory for a desktop client to pick up
    Pickup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub transport: TransportKind,
    pub from: String,
    pub from_name: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    /// Prefer ERF_SMTP_PASSWORD over storing this in the file
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub pickup_dir: PathBuf,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Smtp,
            from: "your.email@example.com".to_string(),
            from_name: Some("Proto4Lab Team".to_string()),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            pickup_dir: PathBuf::from("outbox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of drafts sent in demo mode
    pub limit: usize,
    pub recipients: Vec<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Drafts shown in full before confirmation
    pub limit: usize,
    pub excerpt_chars: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            excerpt_chars: 300,
        }
    }
}

impl Config {
    /// Default config file location (`<config dir>/erf-notify/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => {
                    log::info!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply `ERF_*` overrides read through `var`
    pub fn apply_env_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(statuses) = var("ERF_TARGET_STATUSES") {
            self.filter.target_statuses = statuses
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(from) = var("ERF_MAIL_FROM") {
            self.mail.from = from;
        }
        if let Some(host) = var("ERF_SMTP_HOST") {
            self.mail.smtp_host = host;
        }
        if let Some(port) = var("ERF_SMTP_PORT") {
            self.mail.smtp_port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ERF_SMTP_PORT".to_string(),
                message: format!("'{}' is not a port number", port),
            })?;
        }
        if let Some(user) = var("ERF_SMTP_USERNAME") {
            self.mail.smtp_username = Some(user);
        }
        if let Some(password) = var("ERF_SMTP_PASSWORD") {
            self.mail.smtp_password = Some(password);
        }
        if let Some(file) = var("ERF_MAPPING_FILE") {
            self.resolver.mapping_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns.requester.trim().is_empty() {
            return Err(invalid("columns.requester", "must name a column"));
        }
        if self.columns.status.trim().is_empty() {
            return Err(invalid("columns.status", "must name a column"));
        }
        if self.filter.target_statuses.is_empty() {
            return Err(invalid("filter.target_statuses", "at least one status is required"));
        }
        for field in &self.loader.required_fields {
            if self.columns.header_for(field).is_none() {
                return Err(invalid(
                    "loader.required_fields",
                    &format!("'{}' is not a mapped field", field),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [filter]
            target_statuses = ["Shipped"]
            unmatched = "ignore"

            [columns]
            requester = "Owner"

            [columns.extra]
            site = "Site"
            "#,
        )
        .unwrap();

        assert_eq!(config.filter.target_statuses, vec!["Shipped"]);
        assert_eq!(config.filter.unmatched, UnmatchedStatusPolicy::Ignore);
        assert_eq!(config.columns.requester, "Owner");
        // Unset fields in a present section keep their defaults
        assert_eq!(config.columns.status, "ERF Sched Line Status");
        assert_eq!(config.columns.header_for("site"), Some("Site"));
        assert_eq!(config.columns.header_for("unit"), None);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ERF_TARGET_STATUSES", "On order, Shipped ,"),
            ("ERF_SMTP_PORT", "2525"),
            ("ERF_SMTP_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.filter.target_statuses, vec!["On order", "Shipped"]);
        assert_eq!(config.mail.smtp_port, 2525);
        assert_eq!(config.mail.smtp_password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|k| {
            (k == "ERF_SMTP_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_password_not_serialized() {
        let mut config = Config::default();
        config.mail.smtp_password = Some("secret".to_string());
        let toml = config.to_toml().unwrap();
        assert!(!toml.contains("secret"));
        assert!(toml.contains("target_statuses"));
    }

    #[test]
    fn test_validate_rejects_unmapped_required_field() {
        let mut config = Config::default();
        config.loader.required_fields.push("budget".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.filter.target_statuses.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_required_columns_dedup() {
        let mut columns = ColumnConfig::default();
        columns.required = vec!["Entered by".to_string(), "ERF Nr".to_string()];
        assert_eq!(
            columns.required_columns(&[]),
            vec!["Entered by", "ERF Sched Line Status", "ERF Nr"]
        );

        let fields = vec![
            "status".to_string(),
            "reference".to_string(),
            "unit".to_string(),
        ];
        assert_eq!(
            columns.required_columns(&fields),
            vec!["Entered by", "ERF Sched Line Status", "ERF Nr", "Unit"]
        );
    }

    #[test]
    fn test_template_sources_follow_format() {
        let mut t = TemplateConfig::default();
        assert_eq!(t.body_source(), DEFAULT_BODY);
        t.format = BodyFormat::Html;
        assert_eq!(t.item_source(), DEFAULT_HTML_ITEM);
        t.item = Some("${item}".to_string());
        assert_eq!(t.item_source(), "${item}");
    }
}
