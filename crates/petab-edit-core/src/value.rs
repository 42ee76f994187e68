//! Cell value types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::ColumnKind;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Numeric value (all numbers stored as f64)
    Number(f64),

    /// String value
    Text(String),
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Parse raw user input: empty input maps to [`CellValue::Empty`],
    /// everything else is kept as text until coerced against a column kind.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Empty => None,
        }
    }

    /// Try to get the value as a string slice
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce the value to a column's declared kind.
    ///
    /// Empty values pass through unchanged; a non-empty string that cannot
    /// parse as numeric is rejected for numeric columns and the error
    /// carries the offending input.
    pub fn coerce(self, column: &str, kind: ColumnKind) -> Result<CellValue> {
        match (kind, self) {
            (_, CellValue::Empty) => Ok(CellValue::Empty),
            (ColumnKind::Text, CellValue::Text(s)) => Ok(CellValue::Text(s)),
            (ColumnKind::Text, CellValue::Number(n)) => Ok(CellValue::Text(format_number(n))),
            (ColumnKind::Numeric, CellValue::Number(n)) => Ok(CellValue::Number(n)),
            (ColumnKind::Numeric, CellValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(CellValue::Number(n)),
                _ => Err(Error::Validation {
                    column: column.to_string(),
                    expected: kind,
                    got: s,
                }),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Format a float without a trailing `.0` for whole numbers, so that
/// persisted tables read back identically.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_maps_to_empty() {
        assert_eq!(CellValue::parse(""), CellValue::Empty);
        assert_eq!(CellValue::parse("x"), CellValue::text("x"));
    }

    #[test]
    fn test_coerce_numeric() {
        let v = CellValue::text("0.5").coerce("time", ColumnKind::Numeric).unwrap();
        assert_eq!(v, CellValue::Number(0.5));

        let err = CellValue::text("abc")
            .coerce("time", ColumnKind::Numeric)
            .unwrap_err();
        assert!(err.is_validation());

        // empty always passes, regardless of kind
        let v = CellValue::Empty.coerce("time", ColumnKind::Numeric).unwrap();
        assert_eq!(v, CellValue::Empty);
    }

    #[test]
    fn test_coerce_rejects_non_finite() {
        assert!(CellValue::text("nan")
            .coerce("time", ColumnKind::Numeric)
            .is_err());
        assert!(CellValue::text("inf")
            .coerce("time", ColumnKind::Numeric)
            .is_err());
    }

    #[test]
    fn test_display_round_trips_whole_numbers() {
        assert_eq!(CellValue::Number(1.0).to_string(), "1");
        assert_eq!(CellValue::Number(0.25).to_string(), "0.25");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_serde_untagged() {
        let v: CellValue = serde_json::from_str("0.1").unwrap();
        assert_eq!(v, CellValue::Number(0.1));
        let v: CellValue = serde_json::from_str("\"log10\"").unwrap();
        assert_eq!(v, CellValue::text("log10"));
        let v: CellValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, CellValue::Empty);
    }
}
