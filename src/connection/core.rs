use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::thread;

use crate::cache::{DEFAULT_CACHE_CAPACITY, StatementCache};
use crate::diagnostics::{DiagnosticSink, Severity, TracingSink};
use crate::error::SqliteDirectError;
use crate::ffi::{self, RawConnection, RawStatement};
use crate::params::{Args, bind_args};
use crate::statement::StatementHandle;

use super::BUSY_RETRY_SLEEP;

const DEFAULT_BUSY_RETRY_ATTEMPTS: u32 = 100;

/// Options for [`Connection::open_with_flags`].
#[derive(Debug, Clone, Copy)]
pub struct OpenFlags {
    /// Open read-only; `create` is ignored.
    pub read_only: bool,
    /// Create the file when it does not exist (read-write mode only).
    pub create: bool,
    /// Interpret the path as a `file:` URI.
    pub uri: bool,
    /// Back the database with memory instead of the filesystem.
    pub in_memory: bool,
    /// Skip the engine's per-connection mutex.
    pub no_mutex: bool,
    /// Share the page cache with other connections in this process.
    pub shared_cache: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
            uri: false,
            in_memory: false,
            no_mutex: false,
            shared_cache: false,
        }
    }
}

impl OpenFlags {
    fn bits(self) -> i32 {
        let mut bits = if self.read_only {
            ffi::SQLITE_OPEN_READONLY
        } else {
            ffi::SQLITE_OPEN_READWRITE
        };
        if !self.read_only && self.create {
            bits |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            bits |= ffi::SQLITE_OPEN_URI;
        }
        if self.in_memory {
            bits |= ffi::SQLITE_OPEN_MEMORY;
        }
        bits |= if self.no_mutex {
            ffi::SQLITE_OPEN_NOMUTEX
        } else {
            ffi::SQLITE_OPEN_FULLMUTEX
        };
        bits |= if self.shared_cache {
            ffi::SQLITE_OPEN_SHAREDCACHE
        } else {
            ffi::SQLITE_OPEN_PRIVATECACHE
        };
        bits
    }
}

/// One database session: constructed against a path, then opened, driven,
/// and closed.
///
/// A connection owns the engine handle, the compiled-statement cache, and the
/// execution state the entry points consult: an in-flight flag that rejects
/// reentrant calls, a transaction flag, and the busy-retry attempt bound.
/// Failures never surface as an error type; entry points return `None` or
/// `false`, details go to the [`DiagnosticSink`], and the engine's own code
/// and message stay readable through [`Self::last_error_code`] and
/// [`Self::last_error_message`].
///
/// The type holds `Rc` and `Cell` state, so it is neither `Send` nor `Sync`:
/// one thread drives a connection and everything it hands out.
pub struct Connection {
    db: Option<RawConnection>,
    path: String,
    in_flight: Cell<bool>,
    in_transaction: Cell<bool>,
    busy_retry_attempts: u32,
    trace_execution: bool,
    log_errors: bool,
    cache_enabled: bool,
    cache: RefCell<StatementCache>,
    sink: Rc<dyn DiagnosticSink>,
}

impl Connection {
    /// Point a connection at a database file. No engine resources exist
    /// until [`Self::open`] succeeds.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db: None,
            path: path.as_ref().to_string_lossy().into_owned(),
            in_flight: Cell::new(false),
            in_transaction: Cell::new(false),
            busy_retry_attempts: DEFAULT_BUSY_RETRY_ATTEMPTS,
            trace_execution: false,
            log_errors: true,
            cache_enabled: false,
            cache: RefCell::new(StatementCache::with_capacity(DEFAULT_CACHE_CAPACITY)),
            sink: Rc::new(TracingSink),
        }
    }

    /// Point a connection at a private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(":memory:")
    }

    /// Connect, creating the file when it does not exist. `true` once the
    /// engine handle is ready (or already was); on failure the reason is
    /// logged and the connection stays closed.
    pub fn open(&mut self) -> bool {
        self.connect(RawConnection::open)
    }

    pub fn open_with_flags(&mut self, flags: OpenFlags) -> bool {
        self.connect(|path| RawConnection::open_with_flags(path, flags.bits()))
    }

    fn connect(
        &mut self,
        open: impl FnOnce(&CStr) -> Result<RawConnection, (i32, String)>,
    ) -> bool {
        if self.db.is_some() {
            return true;
        }
        let Ok(c_path) = CString::new(self.path.as_str()) else {
            self.diag_error(&format!(
                "cannot open {:?}: path contains a nul byte",
                self.path
            ));
            return false;
        };
        match open(&c_path) {
            Ok(db) => {
                self.db = Some(db);
                true
            }
            Err((code, message)) => {
                self.diag_error(&format!(
                    "cannot open {:?}: {message} (status {code})",
                    self.path
                ));
                false
            }
        }
    }

    /// Finalize every cached statement, then close the engine handle. `true`
    /// when the engine reports a clean close; harmless on an already-closed
    /// connection, and [`Self::open`] can bring the session back afterwards.
    pub fn close(&mut self) -> bool {
        self.cache.borrow_mut().clear();
        let Some(mut db) = self.db.take() else {
            return true;
        };
        let rc = db.close();
        self.in_transaction.set(false);
        self.in_flight.set(false);
        if rc == ffi::SQLITE_OK {
            true
        } else {
            self.diag_error(&format!("error closing connection: status {rc}"));
            false
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// The path this connection points at, as given at construction.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    /// Upper bound on busy/locked retries per engine call; `0` retries
    /// forever.
    #[must_use]
    pub fn busy_retry_attempts(&self) -> u32 {
        self.busy_retry_attempts
    }

    pub fn set_busy_retry_attempts(&mut self, attempts: u32) {
        self.busy_retry_attempts = attempts;
    }

    #[must_use]
    pub fn trace_execution(&self) -> bool {
        self.trace_execution
    }

    /// Emit each executed statement to the sink at trace severity.
    pub fn set_trace_execution(&mut self, enabled: bool) {
        self.trace_execution = enabled;
    }

    #[must_use]
    pub fn log_errors(&self) -> bool {
        self.log_errors
    }

    /// Route failure diagnostics to the sink; on by default.
    pub fn set_log_errors(&mut self, enabled: bool) {
        self.log_errors = enabled;
    }

    #[must_use]
    pub fn statement_caching(&self) -> bool {
        self.cache_enabled
    }

    /// Keep compiled statements for reuse, keyed by exact query text.
    /// Turning caching off drops everything cached so far.
    pub fn set_statement_caching(&mut self, enabled: bool) {
        if !enabled {
            self.cache.borrow_mut().clear();
        }
        self.cache_enabled = enabled;
    }

    pub fn clear_cached_statements(&self) {
        self.cache.borrow_mut().clear();
    }

    #[must_use]
    pub fn cached_statement_count(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Bound the cache; shrinking below the current size evicts
    /// least-recently-used entries.
    pub fn set_cache_capacity(&self, capacity: usize) {
        self.cache.borrow_mut().resize(capacity);
    }

    /// Replace the diagnostic receiver. The default forwards to `tracing`.
    pub fn set_diagnostic_sink(&mut self, sink: Rc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    /// Engine status of the most recent call; `SQLITE_OK` (0) when closed.
    #[must_use]
    pub fn last_error_code(&self) -> i32 {
        self.db.as_ref().map_or(ffi::SQLITE_OK, RawConnection::errcode)
    }

    /// Engine message for the most recent call.
    #[must_use]
    pub fn last_error_message(&self) -> String {
        self.db
            .as_ref()
            .map_or_else(|| "connection is not open".to_string(), RawConnection::errmsg)
    }

    /// True when the most recent engine status was neither success nor a
    /// step result.
    #[must_use]
    pub fn had_error(&self) -> bool {
        let code = self.last_error_code();
        code != ffi::SQLITE_OK && code != ffi::SQLITE_ROW && code != ffi::SQLITE_DONE
    }

    /// Rows changed by the most recent insert, update, or delete.
    #[must_use]
    pub fn changes(&self) -> i64 {
        self.db.as_ref().map_or(0, RawConnection::changes)
    }

    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.as_ref().map_or(0, RawConnection::last_insert_rowid)
    }

    /// Run a script of zero or more semicolon-separated statements in one
    /// engine call, without placeholders or caching. `true` when the whole
    /// script ran.
    pub fn execute_batch(&self, script: &str) -> bool {
        let _guard = match self.claim() {
            Ok(guard) => guard,
            Err(err) => {
                self.note_failure(script, &err);
                return false;
            }
        };
        self.trace(script);
        match self.run_batch(script) {
            Ok(()) => true,
            Err(err) => {
                self.note_failure(script, &err);
                false
            }
        }
    }

    fn run_batch(&self, script: &str) -> Result<(), SqliteDirectError> {
        let db = self.db.as_ref().ok_or(SqliteDirectError::ConnectionClosed)?;
        let script = CString::new(script)?;
        db.exec(&script)
            .map_err(|(code, message)| SqliteDirectError::Engine { code, message })
    }

    /// Claim the connection for one engine call. Rejects a closed connection
    /// and reentrant use; the returned guard clears the flag when dropped.
    pub(crate) fn claim(&self) -> Result<ExecGuard<'_>, SqliteDirectError> {
        if self.db.is_none() {
            return Err(SqliteDirectError::ConnectionClosed);
        }
        if self.in_flight.get() {
            return Err(SqliteDirectError::InFlight);
        }
        self.in_flight.set(true);
        Ok(ExecGuard {
            flag: &self.in_flight,
        })
    }

    /// Compile one statement, retrying busy/locked statuses under the retry
    /// policy.
    fn compile(&self, sql: &str) -> Result<RawStatement, SqliteDirectError> {
        let db = self.db.as_ref().ok_or(SqliteDirectError::ConnectionClosed)?;
        let c_sql = CString::new(sql)?;
        let limit = self.busy_retry_attempts;
        let mut attempts: u32 = 0;
        loop {
            match db.prepare(&c_sql) {
                Ok(Some(raw)) => return Ok(raw),
                Ok(None) => return Err(SqliteDirectError::EmptyStatement),
                Err(rc) if rc == ffi::SQLITE_BUSY || rc == ffi::SQLITE_LOCKED => {
                    attempts += 1;
                    if limit > 0 && attempts > limit {
                        return Err(SqliteDirectError::BusyTimeout { attempts });
                    }
                    thread::sleep(BUSY_RETRY_SLEEP);
                }
                Err(_) => {
                    return Err(SqliteDirectError::Engine {
                        code: db.errcode(),
                        message: db.errmsg(),
                    });
                }
            }
        }
    }

    /// Fetch-or-compile a statement and bind `args` to it. On a cache hit
    /// the handle is reset and stripped of old bindings first; a cached
    /// handle some cursor is still iterating is passed over and the text is
    /// compiled afresh. A bind failure (count mismatch, unknown name)
    /// discards the handle, cached or not. Returns the handle and whether it
    /// was freshly compiled.
    pub(crate) fn prepare_statement(
        &self,
        sql: &str,
        args: &Args<'_>,
    ) -> Result<(Rc<StatementHandle>, bool), SqliteDirectError> {
        if self.cache_enabled {
            let cached = self.cache.borrow_mut().get(sql);
            if let Some(handle) = cached {
                let _ = handle.retire();
                return match bind_args(handle.raw(), args) {
                    Ok(()) => {
                        handle.note_use();
                        Ok((handle, false))
                    }
                    Err(err) => {
                        self.cache.borrow_mut().remove(sql);
                        Err(err)
                    }
                };
            }
        }
        let raw = self.compile(sql)?;
        let handle = Rc::new(StatementHandle::new(raw, sql));
        bind_args(handle.raw(), args)?;
        handle.note_use();
        Ok((handle, true))
    }

    /// Put a freshly compiled handle into the cache, if caching is on.
    pub(crate) fn register_cached(&self, handle: &Rc<StatementHandle>) {
        if self.cache_enabled {
            self.cache.borrow_mut().insert(Rc::clone(handle));
        }
    }

    /// Route a failed entry point to the sink. Reentrant use is a warning;
    /// everything else is an error.
    pub(crate) fn note_failure(&self, sql: &str, err: &SqliteDirectError) {
        if !self.log_errors {
            return;
        }
        let severity = match err {
            SqliteDirectError::InFlight => Severity::Warning,
            _ => Severity::Error,
        };
        let message = format!("{err} (query: {sql}, path: {:?})", self.path);
        self.sink.record(severity, &message);
    }

    pub(crate) fn diag_warning(&self, message: &str) {
        if self.log_errors {
            self.sink.record(Severity::Warning, message);
        }
    }

    pub(crate) fn diag_error(&self, message: &str) {
        if self.log_errors {
            self.sink.record(Severity::Error, message);
        }
    }

    pub(crate) fn trace(&self, sql: &str) {
        if self.trace_execution {
            self.sink.record(Severity::Trace, &format!("execute: {sql}"));
        }
    }

    pub(crate) fn note_transaction(&self, active: bool) {
        self.in_transaction.set(active);
    }

    /// Force the in-flight flag so tests can exercise the reentrancy guard.
    #[doc(hidden)]
    pub fn set_in_flight_for_tests(&self, value: bool) {
        self.in_flight.set(value);
    }
}

/// Clears the in-flight flag at the end of one engine call, on every exit
/// path.
pub(crate) struct ExecGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for ExecGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("open", &self.db.is_some())
            .field("in_transaction", &self.in_transaction.get())
            .field("statement_caching", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
