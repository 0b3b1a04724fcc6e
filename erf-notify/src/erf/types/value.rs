//! Cell value representation for ERF records

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A value read from a spreadsheet cell or produced while rendering a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Empty cell
    #[default]
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Excel dates carry no zone, so they stay naive
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, or a string that is empty after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as float (integers widen)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text form used for matching and grouping, trimmed
    pub fn to_text(&self) -> String {
        self.to_string().trim().to_string()
    }

    /// Parse a raw text cell (CSV sources) into the narrowest value
    pub fn parse_cell(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }

        match s.to_lowercase().as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }

        // Leading zeros are identifiers (order numbers), not numbers
        let keeps_zeros = s.len() > 1 && s.starts_with('0') && !s.starts_with("0.");
        if !keeps_zeros {
            if let Ok(i) = s.parse::<i64>() {
                return Value::Int(i);
            }
            if let Ok(f) = s.parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }

        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Value::DateTime(dt);
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Value::DateTime(dt);
            }
        }

        Value::String(s.to_string())
    }

    /// Convert an Excel serial date (days since 1899-12-30) to a datetime
    pub fn from_excel_serial(serial: f64) -> Option<Self> {
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
        let millis = (serial * 86_400_000.0).round() as i64;
        epoch
            .checked_add_signed(chrono::Duration::milliseconds(millis))
            .map(Value::DateTime)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => {
                if fl.fract() == 0.0 && fl.abs() < 1e15 {
                    write!(f, "{}", *fl as i64)
                } else {
                    write!(f, "{}", fl)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::DateTime(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}
