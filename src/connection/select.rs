use crate::cursor::Cursor;
use crate::params::Args;
use crate::types::Value;

use super::Connection;

impl Connection {
    /// Execute a row-returning statement with `?` placeholders and hand back
    /// a cursor positioned before the first row.
    ///
    /// `None` covers every failure: closed connection, reentrant call,
    /// compile or bind error, or a parameter-count mismatch. The reason goes
    /// to the diagnostic sink and the engine's last-error accessors.
    ///
    /// The cursor borrows `self` and `args` until it is dropped; text and
    /// blob arguments are handed to the engine by reference, not copied.
    pub fn query<'a>(&'a self, sql: &str, args: &'a [Value]) -> Option<Cursor<'a>> {
        self.run_query(sql, &Args::Positional(args))
    }

    /// [`Self::query`] over `:name` placeholders; `args` pairs bare names
    /// (no prefix) with values. A name that resolves to no placeholder fails
    /// the call.
    pub fn query_named<'a>(
        &'a self,
        sql: &str,
        args: &'a [(&'a str, Value)],
    ) -> Option<Cursor<'a>> {
        self.run_query(sql, &Args::Named(args))
    }

    fn run_query<'a>(&'a self, sql: &str, args: &Args<'a>) -> Option<Cursor<'a>> {
        let _guard = match self.claim() {
            Ok(guard) => guard,
            Err(err) => {
                self.note_failure(sql, &err);
                return None;
            }
        };
        self.trace(sql);
        let (handle, fresh) = match self.prepare_statement(sql, args) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.note_failure(sql, &err);
                return None;
            }
        };
        if fresh {
            self.register_cached(&handle);
        }
        Some(Cursor::new(self, handle, sql.to_string()))
    }
}
