use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use crate::statement::StatementHandle;

pub(crate) const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Compiled-statement cache, keyed by the exact query text (whitespace
/// significant). At most one live handle per distinct query string.
///
/// Bounded LRU: inserting past capacity drops the least recently used
/// entry's reference. Because entries are `Rc`-shared with cursors, eviction
/// finalizes the engine handle only when no cursor still holds it, and a
/// lookup never hands out an entry a cursor is iterating.
pub(crate) struct StatementCache {
    entries: LruCache<String, Rc<StatementHandle>>,
}

impl StatementCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(clamp(capacity)),
        }
    }

    /// Look up a reusable handle, refreshing its recency on a hit. An entry
    /// whose strong count is above one is checked out to a live cursor;
    /// resetting or rebinding it would corrupt that cursor's iteration, so
    /// the lookup reports a miss and the caller compiles afresh.
    pub(crate) fn get(&mut self, sql: &str) -> Option<Rc<StatementHandle>> {
        self.entries
            .get(sql)
            .filter(|handle| Rc::strong_count(handle) == 1)
            .cloned()
    }

    /// Register a handle under its query text. Re-registering the same text
    /// replaces the previous entry, dropping only the cache's reference to
    /// it.
    pub(crate) fn insert(&mut self, handle: Rc<StatementHandle>) {
        self.entries.put(handle.query().to_string(), handle);
    }

    /// Drop one entry, e.g. after its handle failed mid-bind.
    pub(crate) fn remove(&mut self, sql: &str) {
        let _ = self.entries.pop(sql);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn resize(&mut self, capacity: usize) {
        self.entries.resize(clamp(capacity));
    }
}

fn clamp(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}
