//! Finding customers in a snapshot and summing the ledger.

use std::fmt;

use crate::layout::SheetLayout;
use crate::money::amount_or_zero;
use crate::record::{
    Identity, Snapshot, COL_BERDI, COL_NOMINAL, COL_QOLDIQ, COL_SUMMA, MIN_COMPLETE_CELLS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound(Identity),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "no record for {id}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Cache index of the first row matching `identity`, header skipped.
pub fn find_index(snapshot: &Snapshot, identity: &Identity) -> Result<usize, LookupError> {
    snapshot
        .records()
        .find(|(_, row)| identity.matches(row))
        .map(|(i, _)| i)
        .ok_or_else(|| LookupError::NotFound(identity.clone()))
}

/// Sheet row number of the first row matching `identity`.
pub fn find_row(
    snapshot: &Snapshot,
    layout: &SheetLayout,
    identity: &Identity,
) -> Result<u32, LookupError> {
    find_index(snapshot, identity).map(|i| layout.sheet_row(i))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub summa: f64,
    pub berdi: f64,
    pub qoldiq: f64,
    pub nominal: f64,
}

/// Column sums over every complete data row.
pub fn aggregate_totals(snapshot: &Snapshot) -> Totals {
    snapshot
        .records()
        .filter(|(_, row)| row.len() >= MIN_COMPLETE_CELLS)
        .fold(Totals::default(), |mut t, (_, row)| {
            t.summa += amount_or_zero(&row[COL_SUMMA]);
            t.berdi += amount_or_zero(&row[COL_BERDI]);
            t.qoldiq += amount_or_zero(&row[COL_QOLDIQ]);
            t.nominal += amount_or_zero(&row[COL_NOMINAL]);
            t
        })
}
