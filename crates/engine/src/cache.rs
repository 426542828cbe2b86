//! In-memory copy of the ledger.
//!
//! The snapshot is an `Arc` swapped wholesale on refresh, so readers hold a
//! consistent view for the whole of one operation without holding a lock.
//! Refreshes are serialized; the fetch itself runs outside the snapshot lock.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::record::{Cell, Snapshot};
use crate::store::{StoreError, TabularStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The fetch failed and there is no earlier snapshot to fall back on.
    NeverLoaded(StoreError),
    /// The fetch failed; the previous snapshot is still being served.
    Stale(StoreError),
}

impl RefreshError {
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::NeverLoaded(e) | Self::Stale(e) => e,
        }
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverLoaded(e) => write!(f, "ledger never loaded: {e}"),
            Self::Stale(e) => write!(f, "refresh failed, serving stale ledger: {e}"),
        }
    }
}

impl std::error::Error for RefreshError {}

#[derive(Debug, Default)]
struct State {
    snapshot: Arc<Snapshot>,
    loaded: bool,
    stale: bool,
    refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct RecordCache {
    state: Mutex<State>,
    refresh_lock: Mutex<()>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-read the store and swap in the result.
    pub fn refresh(&self, store: &dyn TabularStore) -> Result<Arc<Snapshot>, RefreshError> {
        let _serial = self.refresh_lock.lock();
        match store.fetch_rows() {
            Ok(rows) => {
                let count = rows.len();
                let snapshot = self.install(rows);
                log::debug!("ledger refreshed: {} rows", count);
                Ok(snapshot)
            }
            Err(e) => {
                let mut state = self.state.lock();
                if state.loaded {
                    state.stale = true;
                    log::warn!("ledger refresh failed, keeping previous snapshot: {}", e);
                    Err(RefreshError::Stale(e))
                } else {
                    log::warn!("ledger refresh failed with nothing cached: {}", e);
                    Err(RefreshError::NeverLoaded(e))
                }
            }
        }
    }

    /// Refresh, falling back to the last good snapshot. The flag is true
    /// when the returned snapshot is stale.
    pub fn refresh_or_stale(
        &self,
        store: &dyn TabularStore,
    ) -> Result<(Arc<Snapshot>, bool), RefreshError> {
        match self.refresh(store) {
            Ok(snapshot) => Ok((snapshot, false)),
            Err(RefreshError::Stale(_)) => Ok((self.read(), true)),
            Err(e) => Err(e),
        }
    }

    pub fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.lock().snapshot)
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn is_stale(&self) -> bool {
        self.state.lock().stale
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.state.lock().refreshed_at
    }

    fn install(&self, rows: Vec<Vec<Cell>>) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::new(rows));
        let mut state = self.state.lock();
        state.snapshot = Arc::clone(&snapshot);
        state.loaded = true;
        state.stale = false;
        state.refreshed_at = Some(Utc::now());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::MemoryStore;

    #[test]
    fn test_refresh_swaps_snapshot() {
        let store = MemoryStore::with_rows(vec![vec!["Ism", "Telefon"], vec!["Ali", "A1"]]);
        let cache = RecordCache::new();
        assert!(!cache.is_loaded());
        assert!(cache.last_refreshed().is_none());

        let snap = cache.refresh(&store).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(cache.is_loaded());
        assert!(!cache.is_stale());
        assert!(cache.last_refreshed().is_some());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let store = MemoryStore::with_rows(vec![vec!["Ism", "Telefon"], vec!["Ali", "A1"]]);
        let cache = RecordCache::new();
        let before = cache.refresh(&store).unwrap();

        store.fail_reads(true);
        let err = cache.refresh(&store).unwrap_err();
        assert!(matches!(err, RefreshError::Stale(StoreError::Unavailable(_))));
        assert!(cache.is_stale());
        assert!(Arc::ptr_eq(&before, &cache.read()));

        let (snap, stale) = cache.refresh_or_stale(&store).unwrap();
        assert!(stale);
        assert_eq!(snap.len(), 2);

        store.fail_reads(false);
        cache.refresh(&store).unwrap();
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_failed_first_refresh_reports_error() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        let cache = RecordCache::new();
        assert!(matches!(cache.refresh(&store), Err(RefreshError::NeverLoaded(_))));
        assert!(cache.refresh_or_stale(&store).is_err());
        assert!(cache.read().is_empty());
    }

    #[test]
    fn test_readers_keep_their_view_across_refresh() {
        let store = MemoryStore::with_rows(vec![vec!["Ism", "Telefon"]]);
        let cache = RecordCache::new();
        cache.refresh(&store).unwrap();
        let held = cache.read();

        store.push_row(vec!["Vali", "X"]);
        cache.refresh(&store).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(cache.read().len(), 2);
    }
}
