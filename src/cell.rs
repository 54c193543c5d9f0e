use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A single spreadsheet cell value.
///
/// Source data arrives dynamically typed (text, numbers, dates and blanks
/// mixed in one column), so the value is modelled as a closed variant with
/// exactly one display rule per case rather than coercing everything to
/// strings at the edge.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Canonical textual form of the value, as substituted into documents.
    ///
    /// - `Blank` renders as the empty string (blank cells still resolve, and
    ///   erase their tag).
    /// - Integral numbers render without a decimal point: `42`, not `42.0`.
    /// - Booleans render as `TRUE`/`FALSE`, matching spreadsheet display.
    /// - Date-times at midnight render as a plain date.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Boolean(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            CellValue::DateTime(dt) => {
                if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}
