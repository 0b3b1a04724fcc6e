//! Raw sheet tables and data-sheet detection
//!
//! ERF exports usually come as workbooks holding the raw line list next to
//! one or more pivot summaries. Every sheet is analysed and the raw list is
//! picked by column coverage.

use serde::Serialize;

use crate::config::ColumnConfig;
use crate::erf::Value;

/// Text found in the top-left corner of pivot tables
const PIVOT_INDICATORS: [&str; 5] = [
    "column labels",
    "row labels",
    "count of",
    "sum of",
    "grand total",
];

/// A sheet read into memory: trimmed headers plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawSheet {
    /// Split the first row off as headers
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let headers = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0).iter().map(|v| v.to_text()).collect()
        };
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.iter().all(|h| h.is_empty())
            && self.rows.iter().all(|r| r.iter().all(|v| v.is_blank()))
    }

    /// Index of the first column whose header equals `name`
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Why this sheet looks like a pivot table, if it does
    pub fn pivot_reason(&self) -> Option<String> {
        if self.rows.len() < 3 || self.headers.is_empty() {
            return None;
        }

        let width = self.headers.len();
        let unnamed = self
            .headers
            .iter()
            .filter(|h| h.is_empty() || h.starts_with("Unnamed"))
            .count();
        if unnamed as f64 > width as f64 * 0.7 {
            return Some(format!("{} of {} headers are unnamed", unnamed, width));
        }

        let first = &self.rows[0];
        let empty = (0..width)
            .filter(|&i| first.get(i).is_none_or(|v| v.is_blank()))
            .count();
        if empty as f64 > width as f64 * 0.8 {
            return Some(format!("first row is {} of {} empty", empty, width));
        }

        for row in self.rows.iter().take(5) {
            for cell in row.iter().take(5) {
                let text = cell.to_text().to_lowercase();
                if let Some(indicator) = PIVOT_INDICATORS.iter().find(|i| text.contains(*i)) {
                    return Some(format!("contains '{}'", indicator));
                }
            }
        }

        None
    }
}

/// Result of checking one sheet against the column configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    pub name: String,
    pub data_rows: usize,
    pub columns: usize,
    pub empty: bool,
    pub pivot: Option<String>,
    pub missing_critical: Vec<String>,
    pub missing_required: Vec<String>,
    pub missing_expected: Vec<String>,
    /// Required plus expected columns present
    pub score: usize,
    /// Out of
    pub max_score: usize,
}

impl SheetAnalysis {
    /// Whether this sheet can hold ERF rows at all
    pub fn is_candidate(&self) -> bool {
        !self.empty && self.missing_critical.is_empty() && self.pivot.is_none()
    }

    /// Why the sheet was skipped, if it was
    pub fn rejection(&self) -> Option<String> {
        if self.empty {
            Some("sheet is empty".to_string())
        } else if !self.missing_critical.is_empty() {
            Some(format!(
                "missing critical columns: {}",
                self.missing_critical.join(", ")
            ))
        } else {
            self.pivot
                .as_ref()
                .map(|reason| format!("looks like a pivot table ({})", reason))
        }
    }
}

pub fn analyze(sheet: &RawSheet, columns: &ColumnConfig) -> SheetAnalysis {
    let missing = |names: &[&str]| -> Vec<String> {
        names
            .iter()
            .filter(|n| !sheet.has_column(n))
            .map(|n| n.to_string())
            .collect()
    };

    let critical = columns.critical();
    let required = columns.required_columns(&[]);
    let mut scored: Vec<&str> = required.clone();
    for e in &columns.expected {
        if !scored.contains(&e.as_str()) {
            scored.push(e);
        }
    }
    let score = scored.iter().filter(|c| sheet.has_column(c)).count();

    let expected: Vec<&str> = columns.expected.iter().map(|s| s.as_str()).collect();

    SheetAnalysis {
        name: sheet.name.clone(),
        data_rows: sheet.rows.len(),
        columns: sheet.headers.iter().filter(|h| !h.is_empty()).count(),
        empty: sheet.is_empty(),
        pivot: sheet.pivot_reason(),
        missing_critical: missing(&critical),
        missing_required: missing(&required),
        missing_expected: missing(&expected),
        score,
        max_score: scored.len(),
    }
}

/// Index of the best candidate: highest score, earliest on ties
pub fn select_best(analyses: &[SheetAnalysis]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, analysis) in analyses.iter().enumerate() {
        if !analysis.is_candidate() {
            continue;
        }
        if best.is_none_or(|(_, score)| analysis.score > score) {
            best = Some((i, analysis.score));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Value>> {
        rows.iter()
            .map(|r| r.iter().map(|c| Value::parse_cell(c)).collect())
            .collect()
    }

    fn data_sheet(name: &str) -> RawSheet {
        RawSheet::from_rows(
            name,
            text_rows(&[
                &[" Entered by ", "ERF Sched Line Status", "ERF Nr", "Material"],
                &["JSMITH", "On order", "100", "M-1"],
                &["ADOE", "Received", "101", "M-2"],
                &["JSMITH", "Rejected", "102", "M-3"],
            ]),
        )
    }

    #[test]
    fn test_headers_trimmed() {
        let sheet = data_sheet("Data");
        assert_eq!(sheet.headers[0], "Entered by");
        assert_eq!(sheet.column("Entered by"), Some(0));
        assert_eq!(sheet.rows.len(), 3);
    }

    #[test]
    fn test_pivot_by_indicator() {
        let sheet = RawSheet::from_rows(
            "Pivot",
            text_rows(&[
                &["Entered by", "ERF Sched Line Status", "x"],
                &["Row Labels", "Count of ERF Nr", "y"],
                &["JSMITH", "3", "z"],
                &["Grand Total", "3", "w"],
            ]),
        );
        assert_eq!(sheet.pivot_reason().as_deref(), Some("contains 'row labels'"));
    }

    #[test]
    fn test_pivot_by_unnamed_headers() {
        let sheet = RawSheet::from_rows(
            "Pivot",
            text_rows(&[
                &["Entered by", "", "", "", ""],
                &["a", "b", "c", "d", "e"],
                &["a", "b", "c", "d", "e"],
                &["a", "b", "c", "d", "e"],
            ]),
        );
        assert!(sheet.pivot_reason().unwrap().contains("unnamed"));
    }

    #[test]
    fn test_pivot_by_empty_first_row() {
        let sheet = RawSheet::from_rows(
            "Pivot",
            text_rows(&[
                &["a", "b", "c", "d", "e", "f"],
                &["x", "", "", "", "", ""],
                &["1", "2", "3", "4", "5", "6"],
                &["1", "2", "3", "4", "5", "6"],
            ]),
        );
        assert!(sheet.pivot_reason().unwrap().contains("first row"));
    }

    #[test]
    fn test_small_sheets_never_pivot() {
        let sheet = RawSheet::from_rows("S", text_rows(&[&["Row Labels"], &["Grand Total"]]));
        assert!(sheet.pivot_reason().is_none());
    }

    #[test]
    fn test_analyze_and_select() {
        let columns = ColumnConfig::default();
        let partial = RawSheet::from_rows(
            "Partial",
            text_rows(&[
                &["Entered by", "ERF Sched Line Status"],
                &["JSMITH", "On order"],
            ]),
        );
        let no_status = RawSheet::from_rows(
            "Other",
            text_rows(&[&["Entered by", "ERF Nr", "Material"], &["A", "1", "M"]]),
        );
        let full = data_sheet("Data");
        let empty = RawSheet::from_rows("Empty", Vec::new());

        let analyses: Vec<SheetAnalysis> = [&partial, &no_status, &full, &empty]
            .iter()
            .map(|s| analyze(s, &columns))
            .collect();

        assert_eq!(analyses[0].score, 2);
        assert_eq!(analyses[1].missing_critical, vec!["ERF Sched Line Status"]);
        assert_eq!(analyses[2].score, 4);
        assert!(analyses[2].missing_expected.contains(&"Unit".to_string()));
        assert!(analyses[3].empty);
        assert_eq!(analyses[3].rejection().as_deref(), Some("sheet is empty"));

        assert_eq!(select_best(&analyses), Some(2));
    }

    #[test]
    fn test_select_ties_keep_first() {
        let columns = ColumnConfig::default();
        let a = analyze(&data_sheet("A"), &columns);
        let b = analyze(&data_sheet("B"), &columns);
        assert_eq!(select_best(&[a, b]), Some(0));
        assert_eq!(select_best(&[]), None);
    }
}
