use std::cell::Cell;

use crate::ffi::RawStatement;

/// One compiled statement plus the bookkeeping the cache and cursors need:
/// the exact query text it was compiled from and how many times it has been
/// executed.
///
/// Handles are shared as `Rc<StatementHandle>` between the statement cache
/// and at most one live cursor; the engine handle is finalized when the last
/// owner drops. A cache eviction therefore never invalidates a cursor that is
/// still iterating.
pub(crate) struct StatementHandle {
    raw: RawStatement,
    query: String,
    use_count: Cell<u64>,
}

impl StatementHandle {
    pub(crate) fn new(raw: RawStatement, query: impl Into<String>) -> Self {
        Self {
            raw,
            query: query.into(),
            use_count: Cell::new(0),
        }
    }

    pub(crate) fn raw(&self) -> &RawStatement {
        &self.raw
    }

    pub(crate) fn query(&self) -> &str {
        &self.query
    }

    pub(crate) fn use_count(&self) -> u64 {
        self.use_count.get()
    }

    /// Bump the use counter for one more execution; monotonic for the life of
    /// the handle.
    pub(crate) fn note_use(&self) {
        self.use_count.set(self.use_count.get() + 1);
    }

    /// Return the statement to its pre-execution state and drop every binding
    /// so no stale pointer survives in a cached handle. Reports the reset
    /// status.
    pub(crate) fn retire(&self) -> i32 {
        let rc = self.raw.reset();
        let _ = self.raw.clear_bindings();
        rc
    }

    /// Finalize now and report the engine status, instead of waiting for the
    /// destructor to do it silently.
    pub(crate) fn finalize(self) -> i32 {
        let Self { mut raw, .. } = self;
        raw.finalize()
    }
}
