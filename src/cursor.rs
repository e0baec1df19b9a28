use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::thread;

use chrono::{DateTime, Utc};

use crate::connection::{BUSY_RETRY_SLEEP, Connection};
use crate::ffi::{SQLITE_LOCKED, StepStatus, Storage};
use crate::statement::StatementHandle;
use crate::types::{self, Value};

/// Outcome of one [`Cursor::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A row is available for decoding.
    Row,
    /// No more rows; the cursor has released its statement.
    Done,
    /// The engine reported an error, or the busy-retry limit was hit. The
    /// cursor has released its statement; details went to the diagnostic
    /// sink and the connection's last-error accessors.
    Failed,
}

/// Forward-only iterator over a query's rows.
///
/// Borrowing rules carry the execution contract: a cursor borrows its parent
/// [`Connection`] and the argument slice it was bound from, so neither can be
/// dropped or mutated until the cursor goes away. Dropping the cursor resets
/// the underlying statement (and clears its bindings) so a cached handle is
/// immediately reusable.
pub struct Cursor<'a> {
    conn: &'a Connection,
    stmt: Option<Rc<StatementHandle>>,
    query: String,
    names: OnceCell<HashMap<String, usize>>,
    has_row: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(conn: &'a Connection, stmt: Rc<StatementHandle>, query: String) -> Self {
        Self {
            conn,
            stmt: Some(stmt),
            query,
            names: OnceCell::new(),
            has_row: false,
        }
    }

    /// Step to the next row, retrying busy/locked statuses under the
    /// connection's retry policy.
    pub fn advance(&mut self) -> Step {
        let Some(stmt) = self.stmt.clone() else {
            return Step::Done;
        };
        let limit = self.conn.busy_retry_attempts();
        let mut attempts: u32 = 0;
        let outcome = loop {
            match stmt.raw().step() {
                StepStatus::Row => break Step::Row,
                StepStatus::Done => break Step::Done,
                status @ (StepStatus::Busy | StepStatus::Locked) => {
                    if status == StepStatus::Locked {
                        let rc = stmt.raw().reset();
                        if rc != SQLITE_LOCKED {
                            self.conn
                                .diag_warning(&format!("unexpected reset status {rc} while locked"));
                        }
                    }
                    attempts += 1;
                    if limit > 0 && attempts > limit {
                        self.conn.diag_error(&format!(
                            "busy retry limit reached after {attempts} attempts (query: {}, path: {:?})",
                            self.query,
                            self.conn.path()
                        ));
                        break Step::Failed;
                    }
                    thread::sleep(BUSY_RETRY_SLEEP);
                }
                StepStatus::Other(code) => {
                    self.conn.diag_error(&format!(
                        "step failed with status {code}: {} (query: {}, path: {:?})",
                        self.conn.last_error_message(),
                        self.query,
                        self.conn.path()
                    ));
                    break Step::Failed;
                }
            }
        };
        match outcome {
            Step::Row => self.has_row = true,
            Step::Done | Step::Failed => self.close(),
        }
        outcome
    }

    /// Boolean form of [`Self::advance`]: `true` iff a row is available.
    pub fn next_row(&mut self) -> bool {
        self.advance() == Step::Row
    }

    /// Reset the statement and hand it back to the cache (or finalize it, if
    /// nothing else holds it). Called automatically on exhaustion, failure,
    /// and drop.
    pub fn close(&mut self) {
        self.has_row = false;
        if let Some(stmt) = self.stmt.take() {
            let _ = stmt.retire();
        }
    }

    #[must_use]
    pub fn has_row(&self) -> bool {
        self.has_row
    }

    /// The SQL text this cursor is iterating.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Executions seen by the underlying compiled statement; grows across
    /// cache reuse.
    #[must_use]
    pub fn statement_use_count(&self) -> u64 {
        self.stmt.as_ref().map_or(0, |s| s.use_count())
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.stmt.as_ref().map_or(0, |s| s.raw().column_count())
    }

    #[must_use]
    pub fn column_name(&self, idx: usize) -> Option<String> {
        self.stmt.as_ref()?.raw().column_name(idx)
    }

    /// Zero-based index for a column name, case-insensitively. Duplicate
    /// names resolve to the last occurrence.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names().get(&name.to_lowercase()).copied()
    }

    #[must_use]
    pub fn is_null(&self, idx: usize) -> bool {
        self.live().is_none_or(|stmt| {
            idx >= stmt.raw().column_count() || stmt.raw().column_storage(idx) == Storage::Null
        })
    }

    #[must_use]
    pub fn is_null_named(&self, name: &str) -> bool {
        self.column_index(name).is_none_or(|idx| self.is_null(idx))
    }

    #[must_use]
    pub fn column_i64(&self, idx: usize) -> Option<i64> {
        let stmt = self.valid_at(idx)?;
        match stmt.raw().column_storage(idx) {
            Storage::Null => None,
            _ => Some(stmt.raw().column_i64(idx)),
        }
    }

    /// Typed decode by case-insensitive column name; an unknown name yields
    /// `None`, like a NULL column. The other `_named` getters follow suit.
    #[must_use]
    pub fn column_i64_named(&self, name: &str) -> Option<i64> {
        self.column_index(name).and_then(|idx| self.column_i64(idx))
    }

    #[must_use]
    pub fn column_f64(&self, idx: usize) -> Option<f64> {
        let stmt = self.valid_at(idx)?;
        match stmt.raw().column_storage(idx) {
            Storage::Null => None,
            _ => Some(stmt.raw().column_f64(idx)),
        }
    }

    #[must_use]
    pub fn column_f64_named(&self, name: &str) -> Option<f64> {
        self.column_index(name).and_then(|idx| self.column_f64(idx))
    }

    #[must_use]
    pub fn column_text(&self, idx: usize) -> Option<String> {
        let stmt = self.valid_at(idx)?;
        match stmt.raw().column_storage(idx) {
            Storage::Null => None,
            _ => stmt.raw().column_text(idx),
        }
    }

    #[must_use]
    pub fn column_text_named(&self, name: &str) -> Option<String> {
        self.column_index(name).and_then(|idx| self.column_text(idx))
    }

    #[must_use]
    pub fn column_blob(&self, idx: usize) -> Option<Vec<u8>> {
        let stmt = self.valid_at(idx)?;
        match stmt.raw().column_storage(idx) {
            Storage::Null => None,
            _ => stmt.raw().column_blob(idx),
        }
    }

    #[must_use]
    pub fn column_blob_named(&self, name: &str) -> Option<Vec<u8>> {
        self.column_index(name).and_then(|idx| self.column_blob(idx))
    }

    /// Timestamp decode over the epoch-seconds double encoding.
    #[must_use]
    pub fn column_timestamp(&self, idx: usize) -> Option<DateTime<Utc>> {
        types::epoch_seconds_to_timestamp(self.column_f64(idx)?)
    }

    #[must_use]
    pub fn column_timestamp_named(&self, name: &str) -> Option<DateTime<Utc>> {
        self.column_index(name).and_then(|idx| self.column_timestamp(idx))
    }

    /// Dynamically-typed decode by the column's storage class in the current
    /// row.
    #[must_use]
    pub fn value(&self, idx: usize) -> Value {
        let Some(stmt) = self.valid_at(idx) else {
            return Value::Null;
        };
        match stmt.raw().column_storage(idx) {
            Storage::Null => Value::Null,
            Storage::Integer => Value::BigInt(stmt.raw().column_i64(idx)),
            Storage::Float => Value::Double(stmt.raw().column_f64(idx)),
            Storage::Text => stmt.raw().column_text(idx).map_or(Value::Null, Value::Text),
            Storage::Blob => stmt.raw().column_blob(idx).map_or(Value::Null, Value::Blob),
        }
    }

    /// Name-based decode; an unknown name yields [`Value::Null`] without
    /// touching the engine.
    #[must_use]
    pub fn value_named(&self, name: &str) -> Value {
        self.column_index(name)
            .map_or(Value::Null, |idx| self.value(idx))
    }

    /// The whole current row as a column-name → value map.
    #[must_use]
    pub fn row_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        if let Some(stmt) = self.live() {
            for idx in 0..stmt.raw().column_count() {
                if let Some(name) = stmt.raw().column_name(idx) {
                    map.insert(name, self.value(idx));
                }
            }
        }
        map
    }

    fn live(&self) -> Option<&Rc<StatementHandle>> {
        if self.has_row { self.stmt.as_ref() } else { None }
    }

    fn valid_at(&self, idx: usize) -> Option<&Rc<StatementHandle>> {
        self.live().filter(|stmt| idx < stmt.raw().column_count())
    }

    fn names(&self) -> &HashMap<String, usize> {
        self.names.get_or_init(|| {
            let mut map = HashMap::new();
            if let Some(stmt) = &self.stmt {
                for idx in 0..stmt.raw().column_count() {
                    if let Some(name) = stmt.raw().column_name(idx) {
                        map.insert(name.to_lowercase(), idx);
                    }
                }
            }
            map
        })
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
