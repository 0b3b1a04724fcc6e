//! Per-requester group of records

use serde::Serialize;

use super::Record;

/// All records of one requester, in sheet order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Requester as first seen in the sheet
    pub requester: String,
    pub records: Vec<Record>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records whose status matches `status` (case-insensitive)
    pub fn count_status(&self, status: &str) -> usize {
        self.records.iter().filter(|r| r.has_status(status)).count()
    }
}
