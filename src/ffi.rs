//! Raw `SQLite` access.
//!
//! The only module in the crate that contains `unsafe` code. Everything above
//! this layer works through [`RawConnection`] and [`RawStatement`], which keep
//! the pointer discipline in one place: a raw handle is owned by exactly one
//! wrapper, and the wrapper's `Drop` releases it.

#![allow(unsafe_code)]

use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr;

use libsqlite3_sys as sys;

pub(crate) use sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_LOCKED, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX,
    SQLITE_OPEN_MEMORY, SQLITE_OPEN_NOMUTEX, SQLITE_OPEN_PRIVATECACHE, SQLITE_OPEN_READONLY,
    SQLITE_OPEN_READWRITE, SQLITE_OPEN_SHAREDCACHE, SQLITE_OPEN_URI, SQLITE_ROW,
};

/// Outcome of one `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepStatus {
    Row,
    Done,
    Busy,
    Locked,
    /// Any other status: error, misuse, constraint failure, etc.
    Other(c_int),
}

impl StepStatus {
    fn from_code(rc: c_int) -> Self {
        match rc {
            sys::SQLITE_ROW => Self::Row,
            sys::SQLITE_DONE => Self::Done,
            sys::SQLITE_BUSY => Self::Busy,
            sys::SQLITE_LOCKED => Self::Locked,
            other => Self::Other(other),
        }
    }
}

/// Declared storage class of a column in the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Storage {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl Storage {
    fn from_code(code: c_int) -> Self {
        match code {
            sys::SQLITE_INTEGER => Self::Integer,
            sys::SQLITE_FLOAT => Self::Float,
            sys::SQLITE_TEXT => Self::Text,
            sys::SQLITE_BLOB => Self::Blob,
            _ => Self::Null,
        }
    }
}

fn message_from(ptr: *const c_char) -> String {
    if ptr.is_null() {
        "unknown error".to_string()
    } else {
        // Safety: sqlite error strings are nul-terminated and valid until the
        // next call on the same handle; copied out immediately.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

fn len_as_c_int(len: usize) -> Result<c_int, c_int> {
    c_int::try_from(len).map_err(|_| sys::SQLITE_TOOBIG)
}

/// Owned `sqlite3*` handle.
pub(crate) struct RawConnection {
    db: *mut sys::sqlite3,
}

impl RawConnection {
    /// Open with the engine's default flags (read-write, create).
    pub(crate) fn open(path: &CStr) -> Result<Self, (c_int, String)> {
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // Safety: out-pointer is valid; path is nul-terminated.
        let rc = unsafe { sys::sqlite3_open(path.as_ptr(), &raw mut db) };
        Self::finish_open(rc, db)
    }

    pub(crate) fn open_with_flags(path: &CStr, flags: c_int) -> Result<Self, (c_int, String)> {
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // Safety: as above; a null VFS selects the default.
        let rc = unsafe { sys::sqlite3_open_v2(path.as_ptr(), &raw mut db, flags, ptr::null()) };
        Self::finish_open(rc, db)
    }

    fn finish_open(rc: c_int, db: *mut sys::sqlite3) -> Result<Self, (c_int, String)> {
        if rc == sys::SQLITE_OK && !db.is_null() {
            return Ok(Self { db });
        }
        // On failure the engine usually still hands back a handle carrying
        // the error message; read it, then release the handle.
        let message = if db.is_null() {
            "out of memory".to_string()
        } else {
            // Safety: db is a live handle from sqlite3_open*.
            let message = message_from(unsafe { sys::sqlite3_errmsg(db) });
            unsafe { sys::sqlite3_close(db) };
            message
        };
        Err((rc, message))
    }

    pub(crate) fn errcode(&self) -> c_int {
        // Safety: self.db is live for the lifetime of self.
        unsafe { sys::sqlite3_errcode(self.db) }
    }

    pub(crate) fn errmsg(&self) -> String {
        // Safety: as above.
        message_from(unsafe { sys::sqlite3_errmsg(self.db) })
    }

    pub(crate) fn changes(&self) -> i64 {
        // Safety: as above.
        i64::from(unsafe { sys::sqlite3_changes(self.db) })
    }

    pub(crate) fn last_insert_rowid(&self) -> i64 {
        // Safety: as above.
        unsafe { sys::sqlite3_last_insert_rowid(self.db) }
    }

    /// Run a script of zero or more semicolon-separated statements.
    pub(crate) fn exec(&self, sql: &CStr) -> Result<(), (c_int, String)> {
        let mut err: *mut c_char = ptr::null_mut();
        // Safety: no callback is installed, so the callback argument is unused.
        let rc = unsafe {
            sys::sqlite3_exec(self.db, sql.as_ptr(), None, ptr::null_mut(), &raw mut err)
        };
        if rc == sys::SQLITE_OK {
            return Ok(());
        }
        let message = if err.is_null() {
            self.errmsg()
        } else {
            let message = message_from(err);
            // Safety: sqlite3_exec allocates the message with sqlite3_malloc.
            unsafe { sys::sqlite3_free(err.cast::<c_void>()) };
            message
        };
        Err((rc, message))
    }

    /// Compile one statement. `Ok(None)` means the text held no statement at
    /// all (blank or comment-only); a busy/locked/other status comes back as
    /// the raw code so the caller can drive the retry policy.
    pub(crate) fn prepare(&self, sql: &CStr) -> Result<Option<RawStatement>, c_int> {
        let len = len_as_c_int(sql.to_bytes().len())?;
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        // Safety: sql is nul-terminated with an accurate byte length; the
        // tail pointer is optional and omitted.
        let rc = unsafe {
            sys::sqlite3_prepare_v2(self.db, sql.as_ptr(), len, &raw mut stmt, ptr::null_mut())
        };
        if rc != sys::SQLITE_OK {
            return Err(rc);
        }
        if stmt.is_null() {
            return Ok(None);
        }
        Ok(Some(RawStatement { stmt }))
    }

    /// Close the handle now, reporting the engine status. The wrapper is left
    /// empty so the destructor does not close twice.
    pub(crate) fn close(&mut self) -> c_int {
        if self.db.is_null() {
            return sys::SQLITE_OK;
        }
        // Safety: handle is live and closed exactly once.
        let rc = unsafe { sys::sqlite3_close(self.db) };
        self.db = ptr::null_mut();
        rc
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Owned `sqlite3_stmt*` handle.
///
/// Bind and column methods take `&self`: the mutation happens inside the
/// engine object, and the crate is single-threaded by construction, so no
/// Rust-level aliasing rules are at stake.
pub(crate) struct RawStatement {
    stmt: *mut sys::sqlite3_stmt,
}

impl RawStatement {
    pub(crate) fn step(&self) -> StepStatus {
        // Safety: self.stmt is live until finalize.
        StepStatus::from_code(unsafe { sys::sqlite3_step(self.stmt) })
    }

    pub(crate) fn reset(&self) -> c_int {
        // Safety: as above.
        unsafe { sys::sqlite3_reset(self.stmt) }
    }

    pub(crate) fn clear_bindings(&self) -> c_int {
        // Safety: as above. Clears every slot without reading the old values.
        unsafe { sys::sqlite3_clear_bindings(self.stmt) }
    }

    pub(crate) fn parameter_count(&self) -> usize {
        // Safety: as above.
        let n = unsafe { sys::sqlite3_bind_parameter_count(self.stmt) };
        usize::try_from(n).unwrap_or(0)
    }

    /// 1-based index for a named placeholder (full name, with prefix).
    pub(crate) fn parameter_index(&self, name: &CStr) -> Option<usize> {
        // Safety: as above; name is nul-terminated.
        let idx = unsafe { sys::sqlite3_bind_parameter_index(self.stmt, name.as_ptr()) };
        if idx > 0 { Some(idx as usize) } else { None }
    }

    pub(crate) fn bind_null(&self, idx: usize) -> c_int {
        // Safety: as above.
        unsafe { sys::sqlite3_bind_null(self.stmt, idx as c_int) }
    }

    pub(crate) fn bind_i32(&self, idx: usize, value: i32) -> c_int {
        // Safety: as above.
        unsafe { sys::sqlite3_bind_int(self.stmt, idx as c_int, value) }
    }

    pub(crate) fn bind_i64(&self, idx: usize, value: i64) -> c_int {
        // Safety: as above.
        unsafe { sys::sqlite3_bind_int64(self.stmt, idx as c_int, value) }
    }

    pub(crate) fn bind_f64(&self, idx: usize, value: f64) -> c_int {
        // Safety: as above.
        unsafe { sys::sqlite3_bind_double(self.stmt, idx as c_int, value) }
    }

    /// Bind text without copying. The engine keeps the pointer until the slot
    /// is rebound or cleared; callers uphold that window: cursors borrow
    /// their argument slice for as long as they live, and update paths finish
    /// stepping before returning.
    pub(crate) fn bind_static_text(&self, idx: usize, text: &str) -> c_int {
        let Ok(len) = len_as_c_int(text.len()) else {
            return sys::SQLITE_TOOBIG;
        };
        // Safety: pointer + explicit length, no nul terminator required;
        // SQLITE_STATIC promises the engine the bytes stay put.
        unsafe {
            sys::sqlite3_bind_text(
                self.stmt,
                idx as c_int,
                text.as_ptr().cast::<c_char>(),
                len,
                sys::SQLITE_STATIC(),
            )
        }
    }

    /// Bind text the engine copies immediately; for values serialized on the
    /// fly with no stable backing storage.
    pub(crate) fn bind_transient_text(&self, idx: usize, text: &str) -> c_int {
        let Ok(len) = len_as_c_int(text.len()) else {
            return sys::SQLITE_TOOBIG;
        };
        // Safety: SQLITE_TRANSIENT makes the engine copy before returning.
        unsafe {
            sys::sqlite3_bind_text(
                self.stmt,
                idx as c_int,
                text.as_ptr().cast::<c_char>(),
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    /// Bind a blob without copying; same stability window as
    /// [`Self::bind_static_text`].
    pub(crate) fn bind_static_blob(&self, idx: usize, blob: &[u8]) -> c_int {
        let Ok(len) = len_as_c_int(blob.len()) else {
            return sys::SQLITE_TOOBIG;
        };
        // Safety: a non-null pointer with length zero binds an empty blob,
        // not NULL; slices always give a non-null pointer.
        unsafe {
            sys::sqlite3_bind_blob(
                self.stmt,
                idx as c_int,
                blob.as_ptr().cast::<c_void>(),
                len,
                sys::SQLITE_STATIC(),
            )
        }
    }

    pub(crate) fn column_count(&self) -> usize {
        // Safety: as above.
        let n = unsafe { sys::sqlite3_column_count(self.stmt) };
        usize::try_from(n).unwrap_or(0)
    }

    pub(crate) fn column_name(&self, idx: usize) -> Option<String> {
        // Safety: as above; the engine owns the returned string, copied here.
        let ptr = unsafe { sys::sqlite3_column_name(self.stmt, idx as c_int) };
        if ptr.is_null() {
            None
        } else {
            Some(message_from(ptr))
        }
    }

    pub(crate) fn column_storage(&self, idx: usize) -> Storage {
        // Safety: as above.
        Storage::from_code(unsafe { sys::sqlite3_column_type(self.stmt, idx as c_int) })
    }

    pub(crate) fn column_i64(&self, idx: usize) -> i64 {
        // Safety: as above.
        unsafe { sys::sqlite3_column_int64(self.stmt, idx as c_int) }
    }

    pub(crate) fn column_f64(&self, idx: usize) -> f64 {
        // Safety: as above.
        unsafe { sys::sqlite3_column_double(self.stmt, idx as c_int) }
    }

    pub(crate) fn column_text(&self, idx: usize) -> Option<String> {
        // Safety: text pointer and byte count are read back to back, before
        // any other call touches the statement.
        unsafe {
            let ptr = sys::sqlite3_column_text(self.stmt, idx as c_int);
            if ptr.is_null() {
                return None;
            }
            let len = sys::sqlite3_column_bytes(self.stmt, idx as c_int);
            let bytes =
                std::slice::from_raw_parts(ptr.cast::<u8>(), usize::try_from(len).unwrap_or(0));
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    pub(crate) fn column_blob(&self, idx: usize) -> Option<Vec<u8>> {
        // Safety: as for column_text; a null pointer is a NULL or empty blob.
        unsafe {
            let ptr = sys::sqlite3_column_blob(self.stmt, idx as c_int);
            if ptr.is_null() {
                return None;
            }
            let len = sys::sqlite3_column_bytes(self.stmt, idx as c_int);
            let bytes =
                std::slice::from_raw_parts(ptr.cast::<u8>(), usize::try_from(len).unwrap_or(0));
            Some(bytes.to_vec())
        }
    }

    /// Finalize now, reporting the engine status; the destructor becomes a
    /// no-op afterwards.
    pub(crate) fn finalize(&mut self) -> c_int {
        if self.stmt.is_null() {
            return sys::SQLITE_OK;
        }
        // Safety: finalized exactly once.
        let rc = unsafe { sys::sqlite3_finalize(self.stmt) };
        self.stmt = ptr::null_mut();
        rc
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}
