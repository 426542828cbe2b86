//! Per-actor conversation state with expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Actor id → state, each entry stamped with when it was last touched.
///
/// Expired entries behave as absent. They are dropped lazily on access and
/// in bulk by [`SessionStore::sweep`].
#[derive(Debug)]
pub struct SessionStore<T> {
    entries: Mutex<HashMap<i64, (T, Instant)>>,
    ttl: Duration,
}

impl<T: Clone> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    pub fn get(&self, actor: i64) -> Option<T> {
        self.get_at(actor, Instant::now())
    }

    pub fn get_at(&self, actor: i64, now: Instant) -> Option<T> {
        let mut entries = self.entries.lock();
        match entries.get(&actor) {
            Some((state, touched)) if now.saturating_duration_since(*touched) < self.ttl => {
                Some(state.clone())
            }
            Some(_) => {
                entries.remove(&actor);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, actor: i64, state: T) {
        self.put_at(actor, state, Instant::now());
    }

    pub fn put_at(&self, actor: i64, state: T, now: Instant) {
        self.entries.lock().insert(actor, (state, now));
    }

    pub fn remove(&self, actor: i64) -> Option<T> {
        self.entries.lock().remove(&actor).map(|(state, _)| state)
    }

    /// Apply `f` to the live state under the lock. Returns `None` without
    /// calling `f` if there is no live session.
    pub fn update<R>(&self, actor: i64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.update_at(actor, Instant::now(), f)
    }

    pub fn update_at<R>(
        &self,
        actor: i64,
        now: Instant,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut entries = self.entries.lock();
        let live = entries
            .get(&actor)
            .is_some_and(|(_, touched)| now.saturating_duration_since(*touched) < self.ttl);
        if !live {
            entries.remove(&actor);
            return None;
        }
        let (state, touched) = entries.get_mut(&actor)?;
        *touched = now;
        Some(f(state))
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, (_, touched)| now.saturating_duration_since(*touched) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
