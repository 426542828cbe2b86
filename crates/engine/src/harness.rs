//! In-memory ledger for tests.
//!
//! `MemoryStore` behaves like the sheet behind the default layout: index 0
//! is the header at sheet row 2. It records every call so tests can assert
//! on traffic, and can be told to fail reads or writes or to write slowly.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::layout::{CellAddress, SheetLayout};
use crate::record::Cell;
use crate::store::{StoreError, TabularStore};

/// A write the store accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Row { row: u32, cells: Vec<String> },
    Cell { address: String, value: String },
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Vec<Cell>>>,
    writes: Mutex<Vec<Write>>,
    fetches: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    append_delay_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<&str>>) -> Self {
        let store = Self::new();
        for row in rows {
            store.push_row(row);
        }
        store
    }

    pub fn push_row(&self, cells: Vec<&str>) {
        self.rows.lock().push(cells.into_iter().map(to_cell).collect());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every `append_row` before touching the rows.
    pub fn slow_appends(&self, delay: Duration) {
        self.append_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().clone()
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.rows.lock().clone()
    }

    fn index_of(row: u32) -> Result<usize, StoreError> {
        let start = SheetLayout::default().data_start_row;
        row.checked_sub(start)
            .map(|i| i as usize)
            .ok_or_else(|| StoreError::Rejected(format!("row {row} is above the read range")))
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated write failure".into()));
        }
        Ok(())
    }
}

fn to_cell(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::text(s)
    }
}

impl TabularStore for MemoryStore {
    fn fetch_rows(&self) -> Result<Vec<Vec<Cell>>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated read failure".into()));
        }
        Ok(self.rows.lock().clone())
    }

    fn append_row(&self, row: u32, cells: &[String]) -> Result<(), StoreError> {
        self.check_writes()?;
        let delay = self.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        let index = Self::index_of(row)?;
        let mut rows = self.rows.lock();
        if rows.len() <= index {
            rows.resize(index + 1, Vec::new());
        }
        rows[index] = cells.iter().map(|s| to_cell(s)).collect();
        self.writes.lock().push(Write::Row { row, cells: cells.to_vec() });
        Ok(())
    }

    fn update_cell(&self, address: &CellAddress, value: &str) -> Result<(), StoreError> {
        self.check_writes()?;
        let index = Self::index_of(address.row)?;
        let col = address.column.offset();
        let mut rows = self.rows.lock();
        if rows.len() <= index {
            rows.resize(index + 1, Vec::new());
        }
        let row = &mut rows[index];
        if row.len() <= col {
            row.resize(col + 1, Cell::Empty);
        }
        row[col] = to_cell(value);
        self.writes.lock().push(Write::Cell {
            address: address.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}
