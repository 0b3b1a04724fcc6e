//! Requester → email address resolution
//!
//! ERF exports identify requesters by an engineering id (`JSMITH`), not an
//! address. Ids are looked up in a mapping workbook maintained by hand,
//! optionally by partial match, then by an optional fallback domain.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::ResolverConfig;
use crate::erf::excel::{RawSheet, read_sheets};
use crate::erf::{Recipient, Value};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

static LOCAL_PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._+-]+$").expect("valid local part regex"));

/// Header used for placeholder rows in the mapping workbook
const PLACEHOLDER_ID: &str = "ENG";

pub fn is_email(s: &str) -> bool {
    EMAIL_RE.is_match(s.trim())
}

/// How each resolution was satisfied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Requester already was an address
    pub direct: usize,
    pub mapped: usize,
    pub partial: usize,
    pub fallback: usize,
    pub failed: usize,
}

impl ResolverStats {
    pub fn resolved(&self) -> usize {
        self.direct + self.mapped + self.partial + self.fallback
    }
}

pub struct EmailResolver {
    /// Uppercased id -> address
    mapping: BTreeMap<String, String>,
    partial_match: bool,
    fallback_domain: Option<String>,
    unmapped: BTreeSet<String>,
    stats: ResolverStats,
}

impl EmailResolver {
    pub fn new(
        mapping: BTreeMap<String, String>,
        partial_match: bool,
        fallback_domain: Option<String>,
    ) -> Self {
        let mapping = mapping
            .into_iter()
            .map(|(id, email)| (id.trim().to_uppercase(), email.trim().to_string()))
            .collect();
        Self {
            mapping,
            partial_match,
            fallback_domain,
            unmapped: BTreeSet::new(),
            stats: ResolverStats::default(),
        }
    }

    /// Build from configuration. A missing or unreadable mapping file is
    /// logged and leaves only pass-through and fallback resolution.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mapping = match &config.mapping_file {
            Some(path) => match load_mapping(path) {
                Ok(mapping) => mapping,
                Err(e) => {
                    log::warn!("Email mapping unavailable: {:#}", e);
                    BTreeMap::new()
                }
            },
            None => {
                log::info!("No email mapping file configured");
                BTreeMap::new()
            }
        };
        Self::new(mapping, config.partial_match, config.fallback_domain.clone())
    }

    pub fn mapping_len(&self) -> usize {
        self.mapping.len()
    }

    /// Resolve one requester, recording failures
    pub fn resolve(&mut self, requester: &str) -> Recipient {
        let requester = requester.trim();
        if requester.is_empty() {
            self.stats.failed += 1;
            return Recipient::Unresolved;
        }

        if is_email(requester) {
            self.stats.direct += 1;
            return Recipient::Address(requester.to_string());
        }

        let key = requester.to_uppercase();
        if let Some(email) = self.mapping.get(&key) {
            log::debug!("Resolved {} -> {}", requester, email);
            self.stats.mapped += 1;
            return Recipient::Address(email.clone());
        }

        if self.partial_match {
            let found = self
                .mapping
                .iter()
                .find(|(id, _)| id.contains(&key) || key.contains(id.as_str()));
            if let Some((id, email)) = found {
                log::info!("Partial match: {} -> {} (via {})", requester, email, id);
                self.stats.partial += 1;
                return Recipient::Address(email.clone());
            }
        }

        if let Some(domain) = &self.fallback_domain {
            if LOCAL_PART_RE.is_match(requester) {
                let email = format!("{}@{}", requester.to_lowercase(), domain);
                log::info!("Fallback address for {}: {}", requester, email);
                self.stats.fallback += 1;
                return Recipient::Address(email);
            }
        }

        log::warn!("No email found for: {}", requester);
        self.stats.failed += 1;
        self.unmapped.insert(requester.to_string());
        Recipient::Unresolved
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Requesters without an address, sorted
    pub fn unmapped_users(&self) -> Vec<String> {
        self.unmapped.iter().cloned().collect()
    }
}

/// Read id → address pairs from a mapping workbook or CSV.
///
/// The first column holds ids. The address column is the first header that
/// contains `@`, else the first other column whose leading values do.
pub fn load_mapping(path: &Path) -> Result<BTreeMap<String, String>> {
    let sheets = read_sheets(path)
        .with_context(|| format!("Failed to read email mapping {}", path.display()))?;
    let sheet = sheets
        .into_iter()
        .next()
        .context("Email mapping file has no sheets")?;

    let email_col = find_email_column(&sheet)
        .with_context(|| format!("No email column found in {}", path.display()))?;
    if email_col == 0 {
        bail!("Email column cannot be the id column");
    }

    let mut mapping = BTreeMap::new();
    for row in &sheet.rows {
        let id = row.first().map(Value::to_text).unwrap_or_default();
        let email = row.get(email_col).map(Value::to_text).unwrap_or_default();
        if id.is_empty() || id.eq_ignore_ascii_case(PLACEHOLDER_ID) || !email.contains('@') {
            continue;
        }
        mapping.insert(id.to_uppercase(), email);
    }

    log::info!(
        "Loaded {} email mappings from {}",
        mapping.len(),
        path.display()
    );
    for (id, email) in mapping.iter().take(3) {
        log::debug!("  {} -> {}", id, email);
    }
    Ok(mapping)
}

fn find_email_column(sheet: &RawSheet) -> Option<usize> {
    if let Some(i) = sheet.headers.iter().position(|h| h.contains('@')) {
        return Some(i);
    }

    (1..sheet.headers.len()).find(|&col| {
        sheet
            .rows
            .iter()
            .filter_map(|r| r.get(col))
            .filter(|v| !v.is_blank())
            .take(3)
            .any(|v| v.to_text().contains('@'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn resolver(partial: bool, fallback: Option<&str>) -> EmailResolver {
        let mapping = [
            ("jsmith", "john.smith@example.com"),
            ("ADOE01", "anna.doe@example.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        EmailResolver::new(mapping, partial, fallback.map(String::from))
    }

    #[test]
    fn test_direct_and_mapped() {
        let mut r = resolver(false, None);
        assert_eq!(
            r.resolve("someone@example.com"),
            Recipient::Address("someone@example.com".to_string())
        );
        assert_eq!(
            r.resolve(" JSmith "),
            Recipient::Address("john.smith@example.com".to_string())
        );
        assert_eq!(r.stats().direct, 1);
        assert_eq!(r.stats().mapped, 1);
    }

    #[test]
    fn test_partial_match() {
        let mut r = resolver(true, None);
        assert_eq!(
            r.resolve("ADOE"),
            Recipient::Address("anna.doe@example.com".to_string())
        );
        assert_eq!(r.stats().partial, 1);

        let mut r = resolver(false, None);
        assert_eq!(r.resolve("ADOE"), Recipient::Unresolved);
    }

    #[test]
    fn test_fallback_domain() {
        let mut r = resolver(false, Some("example.org"));
        assert_eq!(
            r.resolve("BLEE"),
            Recipient::Address("blee@example.org".to_string())
        );
        // Not usable as a local part
        assert_eq!(r.resolve("Bob Lee"), Recipient::Unresolved);
        assert_eq!(r.stats().fallback, 1);
    }

    #[test]
    fn test_unmapped_tracked_once() {
        let mut r = resolver(false, None);
        r.resolve("ZED");
        r.resolve("ZED");
        r.resolve("AMY");
        assert_eq!(r.unmapped_users(), vec!["AMY", "ZED"]);
        assert_eq!(r.stats().failed, 3);
        assert_eq!(r.stats().resolved(), 0);
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("a.b@c.com"));
        assert!(!is_email("JSMITH"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a b@c.com"));
    }

    #[test]
    fn test_load_mapping_detects_email_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            b"Eng ID,Name,Address\n\
              ENG,placeholder,eng@example.com\n\
              jsmith,John Smith,john.smith@example.com\n\
              adoe,Anna Doe,\n\
              blee,Bo Lee,not an address\n",
        )
        .unwrap();

        let mapping = load_mapping(&path).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.get("JSMITH").map(String::as_str),
            Some("john.smith@example.com")
        );
    }

    #[test]
    fn test_load_mapping_without_email_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.csv");
        std::fs::write(&path, "Eng ID,Name\njsmith,John\n").unwrap();
        assert!(load_mapping(&path).is_err());
    }

    #[test]
    fn test_from_config_missing_file() {
        let config = ResolverConfig {
            mapping_file: Some(std::path::PathBuf::from("/nonexistent/mapping.xlsx")),
            ..ResolverConfig::default()
        };
        let mut r = EmailResolver::from_config(&config);
        assert_eq!(r.mapping_len(), 0);
        assert_eq!(r.resolve("JSMITH"), Recipient::Unresolved);
    }
}
