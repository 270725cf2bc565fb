use serde::{Deserialize, Serialize};

/// Raw spreadsheet cell as handed over by the reader
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl CellValue {
    /// Blank, zero, false, NaN and empty text all count as "no value",
    /// matching how the sheet was filled in by hand.
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Bool(b) => !b,
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Text(s) => s.is_empty(),
        }
    }
}

pub fn cell(row: &[CellValue], index: usize) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    row.get(index).unwrap_or(&EMPTY)
}

/// Numeric coercion: anything unparseable becomes 0.
pub fn to_number(value: &CellValue) -> f64 {
    let parsed = match value {
        CellValue::Empty => 0.0,
        CellValue::Bool(b) => f64::from(u8::from(*b)),
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
    };

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Count coercion: numeric coercion, rounded and clamped at 0.
pub fn to_count(value: &CellValue) -> u64 {
    let n = to_number(value).round();
    if n <= 0.0 {
        0
    } else {
        n as u64
    }
}

/// String coercion: falsy cells become "", everything else is trimmed text.
pub fn to_text(value: &CellValue) -> String {
    if value.is_falsy() {
        return String::new();
    }

    match value {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Empty => String::new(),
    }
}

/// Same as `to_text` but with a fallback for falsy cells.
pub fn to_text_or(value: &CellValue, fallback: &str) -> String {
    if value.is_falsy() {
        fallback.to_string()
    } else {
        to_text(value)
    }
}

/// Only the literal "Sim" or a boolean true count as yes.
pub fn to_flag(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(b) => *b,
        CellValue::Text(s) => s == "Sim",
        _ => false,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
