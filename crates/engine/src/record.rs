//! Customer records as they sit in the sheet.
//!
//! A row is `Name, Phone, Summa, Berdi, Qoldiq, NominalSum` followed by the
//! monthly payment cells. Row 0 of every snapshot is the header and is never
//! treated as data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 0-based position of the fixed columns inside a row.
pub const COL_NAME: usize = 0;
pub const COL_PHONE: usize = 1;
pub const COL_SUMMA: usize = 2;
pub const COL_BERDI: usize = 3;
pub const COL_QOLDIQ: usize = 4;
pub const COL_NOMINAL: usize = 5;

/// Rows shorter than this carry no totals and are skipped by aggregation.
pub const MIN_COMPLETE_CELLS: usize = 6;

/// A dynamic cell value as returned by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Cell {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Empty,
            serde_json::Value::Bool(b) => Cell::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            serde_json::Value::String(s) if s.is_empty() => Cell::Empty,
            serde_json::Value::String(s) => Cell::Text(s),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// The (Name, Phone) pair that addresses one customer.
///
/// Matching is case-insensitive and otherwise exact. Two rows with the same
/// identity are not prevented; lookups take the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub phone: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self { name: name.into(), phone: phone.into() }
    }

    /// Unpack a `Name|Phone` payload. The name may not contain `|`; the
    /// phone may.
    pub fn unpack(packed: &str) -> Option<Self> {
        let (name, phone) = packed.split_once('|')?;
        Some(Self::new(name, phone))
    }

    pub fn pack(&self) -> String {
        format!("{}|{}", self.name, self.phone)
    }

    pub fn matches(&self, row: &[Cell]) -> bool {
        match (row.get(COL_NAME), row.get(COL_PHONE)) {
            (Some(name), Some(phone)) => {
                eq_ignore_case(&name.to_string(), &self.name)
                    && eq_ignore_case(&phone.to_string(), &self.phone)
            }
            _ => false,
        }
    }

    /// Identity of a data row, if it has both leading cells.
    pub fn of_row(row: &[Cell]) -> Option<Self> {
        if row.len() < 2 {
            return None;
        }
        Some(Self::new(row[COL_NAME].to_string(), row[COL_PHONE].to_string()))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.phone)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Immutable copy of the sheet as of one refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    rows: Vec<Vec<Cell>>,
}

impl Snapshot {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Number of rows including the header.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    /// Data rows with their cache index, header skipped.
    pub fn records(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows.iter().enumerate().skip(1).map(|(i, r)| (i, r.as_slice()))
    }

    /// Data rows that carry an identity (at least Name and Phone).
    pub fn identities(&self) -> impl Iterator<Item = (usize, Identity)> + '_ {
        self.records()
            .filter_map(|(i, row)| Identity::of_row(row).map(|id| (i, id)))
    }
}
