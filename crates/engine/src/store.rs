//! The spreadsheet seen from the engine.
//!
//! Adapters (Google Sheets in production, an in-memory table in tests)
//! implement [`TabularStore`]. The engine never knows which one it talks to.

use std::fmt;

use crate::layout::CellAddress;
use crate::record::Cell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network failure, timeout, throttling or an open circuit.
    Unavailable(String),
    /// The store refused the request (auth, bad range, permissions).
    Rejected(String),
    /// The response could not be understood.
    Malformed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Rejected(msg) => write!(f, "store rejected request: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed store response: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub trait TabularStore: Send + Sync {
    /// Every row of the read range, header first. Trailing empty cells may
    /// be missing, so rows are ragged.
    fn fetch_rows(&self) -> Result<Vec<Vec<Cell>>, StoreError>;

    /// Write `cells` into sheet row `row` starting at column A. Cells are
    /// interpreted as user input, so `=` prefixes become formulas.
    fn append_row(&self, row: u32, cells: &[String]) -> Result<(), StoreError>;

    /// Overwrite one cell, interpreted as user input.
    fn update_cell(&self, address: &CellAddress, value: &str) -> Result<(), StoreError>;
}
