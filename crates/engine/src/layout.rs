//! Sheet geometry: which column holds which month, and A1 addressing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Uzbek month names as they appear on buttons and in the sheet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Month {
    Yanvar,
    Fevral,
    Mart,
    Aprel,
    May,
    Iyun,
    Iyul,
    Avgust,
    Sentabr,
    Oktabr,
    Noyabr,
    Dekabr,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Yanvar,
        Month::Fevral,
        Month::Mart,
        Month::Aprel,
        Month::May,
        Month::Iyun,
        Month::Iyul,
        Month::Avgust,
        Month::Sentabr,
        Month::Oktabr,
        Month::Noyabr,
        Month::Dekabr,
    ];

    /// 0-based position in the year.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::Yanvar => "Yanvar",
            Month::Fevral => "Fevral",
            Month::Mart => "Mart",
            Month::Aprel => "Aprel",
            Month::May => "May",
            Month::Iyun => "Iyun",
            Month::Iyul => "Iyul",
            Month::Avgust => "Avgust",
            Month::Sentabr => "Sentabr",
            Month::Oktabr => "Oktabr",
            Month::Noyabr => "Noyabr",
            Month::Dekabr => "Dekabr",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| AddressError::UnknownMonth(s.to_string()))
    }
}

/// Why a (year, month) pair has no column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    UnknownYear(String),
    UnknownMonth(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownYear(y) => write!(f, "unknown year: {y}"),
            Self::UnknownMonth(m) => write!(f, "unknown month: {m}"),
        }
    }
}

impl std::error::Error for AddressError {}

/// 1-based sheet column (A = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(pub u32);

impl Column {
    /// Spreadsheet letters: 1 → A, 26 → Z, 27 → AA.
    pub fn letters(self) -> String {
        let mut result = String::new();
        let mut n = self.0.saturating_sub(1);
        loop {
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            if n < 26 {
                break;
            }
            n = n / 26 - 1;
        }
        result
    }

    /// 0-based position of this column inside a fetched row.
    pub fn offset(self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

/// A single cell in A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    pub column: Column,
    pub row: u32,
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column.letters(), self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Sheet row of cache index 0 (the header).
    pub data_start_row: u32,
    /// Column of January of `first_year`.
    pub first_payment_column: u32,
    pub first_year: i32,
    pub year_count: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            data_start_row: 2,
            first_payment_column: 7,
            first_year: 2025,
            year_count: 2,
        }
    }
}

impl SheetLayout {
    pub fn years(&self) -> impl Iterator<Item = i32> {
        let first = self.first_year;
        (0..self.year_count as i32).map(move |i| first + i)
    }

    pub fn payment_column(&self, year: i32, month: Month) -> Result<Column, AddressError> {
        let offset = year - self.first_year;
        if offset < 0 || offset >= self.year_count as i32 {
            return Err(AddressError::UnknownYear(year.to_string()));
        }
        Ok(Column(self.first_payment_column + 12 * offset as u32 + month.index()))
    }

    /// Column for the textual (year, month) pair carried by buttons.
    pub fn cell_column(&self, year: &str, month: &str) -> Result<Column, AddressError> {
        let year_num: i32 = year
            .trim()
            .parse()
            .map_err(|_| AddressError::UnknownYear(year.to_string()))?;
        let month: Month = month.trim().parse()?;
        self.payment_column(year_num, month)
    }

    /// Sheet row of a cache index.
    pub fn sheet_row(&self, index: usize) -> u32 {
        index as u32 + self.data_start_row
    }

    /// First and last monthly column, the span summed by the Berdi formula.
    pub fn payment_span(&self) -> (Column, Column) {
        let first = Column(self.first_payment_column);
        let last = Column(self.first_payment_column + 12 * self.year_count - 1);
        (first, last)
    }
}
