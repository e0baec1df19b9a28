use std::rc::Rc;
use std::thread;

use crate::error::SqliteDirectError;
use crate::ffi::{SQLITE_LOCKED, SQLITE_OK, StepStatus};
use crate::params::Args;
use crate::statement::StatementHandle;
use crate::types::Value;

use super::{BUSY_RETRY_SLEEP, Connection};

impl Connection {
    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE,
    /// DDL) with `?` placeholders. `true` only when the statement ran to
    /// completion; any failure is `false`, with the reason on the diagnostic
    /// sink and the last-error accessors.
    pub fn execute(&self, sql: &str, args: &[Value]) -> bool {
        self.run_update(sql, &Args::Positional(args))
    }

    /// [`Self::execute`] over `:name` placeholders; `args` pairs bare names
    /// with values. A name that resolves to no placeholder fails the call.
    pub fn execute_named(&self, sql: &str, args: &[(&str, Value)]) -> bool {
        self.run_update(sql, &Args::Named(args))
    }

    fn run_update(&self, sql: &str, args: &Args<'_>) -> bool {
        let _guard = match self.claim() {
            Ok(guard) => guard,
            Err(err) => {
                self.note_failure(sql, &err);
                return false;
            }
        };
        self.trace(sql);
        let (handle, fresh) = match self.prepare_statement(sql, args) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.note_failure(sql, &err);
                return false;
            }
        };

        let limit = self.busy_retry_attempts();
        let mut attempts: u32 = 0;
        let mut done = false;
        loop {
            match handle.raw().step() {
                StepStatus::Done => {
                    done = true;
                    break;
                }
                // Statements with a RETURNING clause produce rows; keep
                // driving until the engine reports completion.
                StepStatus::Row => {}
                status @ (StepStatus::Busy | StepStatus::Locked) => {
                    if status == StepStatus::Locked {
                        let rc = handle.raw().reset();
                        if rc != SQLITE_LOCKED {
                            self.diag_warning(&format!(
                                "unexpected reset status {rc} while locked"
                            ));
                        }
                    }
                    attempts += 1;
                    if limit > 0 && attempts > limit {
                        self.note_failure(sql, &SqliteDirectError::BusyTimeout { attempts });
                        break;
                    }
                    thread::sleep(BUSY_RETRY_SLEEP);
                }
                StepStatus::Other(code) => {
                    self.note_failure(
                        sql,
                        &SqliteDirectError::Engine {
                            code,
                            message: self.last_error_message(),
                        },
                    );
                    break;
                }
            }
        }

        // Hand the statement back: reset and re-cache when caching is on,
        // finalize otherwise. Either way no binding survives this call.
        let close_rc = if self.statement_caching() {
            let rc = handle.retire();
            if fresh {
                self.register_cached(&handle);
            }
            rc
        } else {
            Rc::try_unwrap(handle).map_or(SQLITE_OK, StatementHandle::finalize)
        };
        if close_rc != SQLITE_OK && done {
            self.diag_warning(&format!(
                "statement cleanup returned status {close_rc} (query: {sql})"
            ));
        }
        done
    }
}
