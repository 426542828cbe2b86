//! Amount parsing and currency display.
//!
//! Cells reach us in several shapes: plain numbers (unformatted reads),
//! currency strings such as `"$1 234,50"` (formatted reads), or the already
//! evaluated result of a formula. All of them go through one normalization:
//!
//! 1. `$` markers are removed
//! 2. every Unicode whitespace character (NBSP, narrow NBSP, thin space, …)
//!    is treated as a plain space and then removed
//! 3. a decimal comma becomes a decimal point
//! 4. the rest must parse as a finite `f64`
//!
//! [`parse_amount`] reports failures; [`amount_or_zero`] is the tolerant
//! variant used for display and aggregation, where a malformed cell counts
//! as zero.

use std::fmt;

use crate::record::Cell;

/// Why a value could not be read as an amount.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountError {
    /// Nothing left after stripping currency markers and whitespace.
    Empty,
    /// Text that is not a finite number.
    Invalid(String),
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty amount"),
            Self::Invalid(raw) => write!(f, "not a number: {raw:?}"),
        }
    }
}

impl std::error::Error for AmountError {}

/// Parse a cell into an amount.
pub fn parse_amount(cell: &Cell) -> Result<f64, AmountError> {
    match cell {
        Cell::Number(n) if n.is_finite() => Ok(*n),
        Cell::Number(n) => Err(AmountError::Invalid(n.to_string())),
        Cell::Text(s) => parse_amount_str(s),
        Cell::Empty => Err(AmountError::Empty),
        Cell::Bool(b) => Err(AmountError::Invalid(b.to_string())),
    }
}

/// Parse free text (user input or a formatted cell) into an amount.
pub fn parse_amount_str(raw: &str) -> Result<f64, AmountError> {
    let cleaned = normalize(raw);
    if cleaned.is_empty() {
        return Err(AmountError::Empty);
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AmountError::Invalid(raw.trim().to_string())),
    }
}

/// Tolerant read: any malformed or empty cell counts as `0.0`.
pub fn amount_or_zero(cell: &Cell) -> f64 {
    parse_amount(cell).unwrap_or(0.0)
}

/// `$` + two decimals with a decimal comma: `1234.5` → `"$1234,50"`.
pub fn format_money(value: f64) -> String {
    format!("${}", format!("{:.2}", value).replace('.', ","))
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| *c != ' ' && *c != '$')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}
