//! ERF record as loaded from one spreadsheet row

use std::collections::BTreeMap;

use serde::Serialize;

use super::Value;

/// Logical field names every record carries
pub mod fields {
    pub const REQUESTER: &str = "requester";
    pub const STATUS: &str = "status";
    pub const ITEM: &str = "item";
    pub const QUANTITY: &str = "quantity";
    pub const REFERENCE: &str = "reference";
    pub const ROW: &str = "row";

    pub const CORE: [&str; 5] = [REQUESTER, STATUS, ITEM, QUANTITY, REFERENCE];
}

/// One validated ERF row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// 1-based sheet row (the header is row 1)
    pub row: usize,
    pub requester: String,
    pub status: String,
    pub item: Option<String>,
    pub quantity: Option<Value>,
    pub reference: Option<String>,
    /// Additional mapped columns, keyed by logical name
    pub extra: BTreeMap<String, Value>,
}

impl Record {
    /// Look up a field by logical name
    pub fn field(&self, name: &str) -> Value {
        match name {
            fields::REQUESTER => Value::String(self.requester.clone()),
            fields::STATUS => Value::String(self.status.clone()),
            fields::ITEM => opt_string(&self.item),
            fields::QUANTITY => self.quantity.clone().unwrap_or_default(),
            fields::REFERENCE => opt_string(&self.reference),
            fields::ROW => Value::from(self.row),
            other => self.extra.get(other).cloned().unwrap_or_default(),
        }
    }

    /// All fields as (name, value) pairs, core fields first
    pub fn fields(&self) -> Vec<(String, Value)> {
        let mut out: Vec<(String, Value)> = fields::CORE
            .iter()
            .chain(std::iter::once(&fields::ROW))
            .map(|name| (name.to_string(), self.field(name)))
            .collect();
        out.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// Status matches `target` ignoring case and surrounding whitespace
    pub fn has_status(&self, target: &str) -> bool {
        self.status.trim().to_lowercase() == target.trim().to_lowercase()
    }
}

fn opt_string(s: &Option<String>) -> Value {
    s.as_ref().map(|s| Value::String(s.clone())).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a record with just the fields most tests care about
    pub fn record(row: usize, requester: &str, status: &str, item: &str) -> Record {
        Record {
            row,
            requester: requester.to_string(),
            status: status.to_string(),
            item: Some(item.to_string()),
            quantity: Some(Value::Int(1)),
            reference: Some(format!("ERF-{}", row)),
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;

    #[test]
    fn test_field_lookup() {
        let mut r = record(2, "JSMITH", "On order", "Pump");
        r.extra
            .insert("unit".to_string(), Value::String("EA".to_string()));

        assert_eq!(r.field("requester"), Value::String("JSMITH".into()));
        assert_eq!(r.field("reference"), Value::String("ERF-2".into()));
        assert_eq!(r.field("row"), Value::Int(2));
        assert_eq!(r.field("unit"), Value::String("EA".into()));
        assert_eq!(r.field("nope"), Value::Null);
    }

    #[test]
    fn test_has_status_case_insensitive() {
        let r = record(2, "JSMITH", " On Order ", "Pump");
        assert!(r.has_status("on order"));
        assert!(!r.has_status("Received"));
    }

    #[test]
    fn test_fields_order() {
        let mut r = record(2, "A", "Received", "Valve");
        r.extra.insert("unit".to_string(), Value::from("EA"));
        let names: Vec<String> = r.fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["requester", "status", "item", "quantity", "reference", "row", "unit"]
        );
    }
}
