use std::fmt;

use serde::{Serialize, Serializer};

/// A scalar report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
}

/// One report row. An empty row is a blank separator.
pub type Row = Vec<Cell>;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Numeric reading used by percentage rows: `N/A` and blanks read as zero,
    /// unparsable text as `None`.
    pub(crate) fn percent_input(cell: Option<&Cell>) -> Option<f64> {
        match cell {
            None | Some(Cell::Blank) => Some(0.0),
            Some(Cell::Number(value)) => Some(*value),
            Some(Cell::Text(text)) if text == "N/A" => Some(0.0),
            Some(Cell::Text(text)) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Blank => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Blank => serializer.serialize_str(""),
            Cell::Text(text) => serializer.serialize_str(text),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => {
                serializer.serialize_i64(*value as i64)
            }
            Cell::Number(value) => serializer.serialize_f64(*value),
        }
    }
}

/// Fixed-point rendering with ties rounded away from zero.
pub(crate) fn fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    format!("{rounded:.digits$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_plain_scalars() {
        let row: Row = vec![Cell::Blank, Cell::text("Q1"), Cell::Number(3.0), Cell::Number(2.5)];
        assert_eq!(serde_json::to_value(&row).expect("json"), json!(["", "Q1", 3, 2.5]));
    }

    #[test]
    fn fixed_rounds_half_up() {
        assert_eq!(fixed(0.125, 2), "0.13");
        assert_eq!(fixed(40.0, 2), "40.00");
        assert_eq!(fixed(66.666_666, 2), "66.67");
        assert_eq!(fixed(12.5, 0), "13");
    }

    #[test]
    fn percent_input_reads_markers_as_zero() {
        assert_eq!(Cell::percent_input(Some(&Cell::text("N/A"))), Some(0.0));
        assert_eq!(Cell::percent_input(Some(&Cell::Blank)), Some(0.0));
        assert_eq!(Cell::percent_input(None), Some(0.0));
        assert_eq!(Cell::percent_input(Some(&Cell::text("abc"))), None);
        assert_eq!(Cell::percent_input(Some(&Cell::Number(4.0))), Some(4.0));
    }
}
