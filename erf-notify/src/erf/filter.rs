//! Status filter

use std::collections::BTreeMap;

use crate::config::UnmatchedStatusPolicy;
use crate::erf::Record;

/// Records to notify about, plus a count of everything left out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Matching records in input order
    pub kept: Vec<Record>,
    /// Excluded row count per distinct status (as written in the sheet)
    pub excluded: BTreeMap<String, usize>,
}

impl FilterOutcome {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }
}

/// Keep records whose status is one of `targets`, ignoring case and
/// surrounding whitespace
pub fn filter_by_status(
    records: Vec<Record>,
    targets: &[String],
    policy: UnmatchedStatusPolicy,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for record in records {
        if targets.iter().any(|t| record.has_status(t)) {
            outcome.kept.push(record);
        } else {
            let status = record.status.trim().to_string();
            *outcome.excluded.entry(status).or_default() += 1;
        }
    }

    for (status, count) in &outcome.excluded {
        match policy {
            UnmatchedStatusPolicy::Warn => {
                log::warn!("Skipping {} rows with status '{}'", count, status)
            }
            UnmatchedStatusPolicy::Ignore => {
                log::debug!("Skipping {} rows with status '{}'", count, status)
            }
        }
    }

    log::info!(
        "Filtered {} records with target statuses ({} excluded)",
        outcome.kept.len(),
        outcome.excluded_total()
    );
    outcome
}

/// Count of `records` per target status, keyed by the configured spelling
pub fn status_breakdown(records: &[Record], targets: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for target in targets {
        let n = records.iter().filter(|r| r.has_status(target)).count();
        if n > 0 {
            counts.insert(target.clone(), n);
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::test_support::record;

    fn targets() -> Vec<String> {
        vec!["On order".to_string(), "Received".to_string()]
    }

    #[test]
    fn test_keeps_target_statuses_in_order() {
        let records = vec![
            record(2, "Alice", "On order", "Pump"),
            record(3, "Bob", "Rejected", "Valve"),
            record(4, "Alice", " RECEIVED ", "Gasket"),
            record(5, "Carol", "Cancelled", "Seal"),
            record(6, "Bob", "Rejected", "Bolt"),
        ];

        let outcome = filter_by_status(records, &targets(), UnmatchedStatusPolicy::Warn);
        let rows: Vec<usize> = outcome.kept.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 4]);
        assert_eq!(outcome.excluded.get("Rejected"), Some(&2));
        assert_eq!(outcome.excluded.get("Cancelled"), Some(&1));
        assert_eq!(outcome.excluded_total(), 3);
    }

    #[test]
    fn test_policy_does_not_change_result() {
        let make = || {
            vec![
                record(2, "Alice", "On order", "Pump"),
                record(3, "Bob", "Rejected", "Valve"),
            ]
        };
        let warn = filter_by_status(make(), &targets(), UnmatchedStatusPolicy::Warn);
        let ignore = filter_by_status(make(), &targets(), UnmatchedStatusPolicy::Ignore);
        assert_eq!(warn, ignore);
    }

    #[test]
    fn test_empty_input() {
        let outcome = filter_by_status(Vec::new(), &targets(), UnmatchedStatusPolicy::Warn);
        assert!(outcome.kept.is_empty());
        assert!(outcome.excluded.is_empty());
    }

    #[test]
    fn test_status_breakdown_uses_configured_spelling() {
        let records = vec![
            record(2, "Alice", "on order", "Pump"),
            record(3, "Alice", "ON ORDER", "Valve"),
        ];
        let breakdown = status_breakdown(&records, &targets());
        assert_eq!(breakdown.get("On order"), Some(&2));
        assert!(!breakdown.contains_key("Received"));
    }
}
