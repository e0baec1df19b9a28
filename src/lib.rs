//! Thin, synchronous access to `SQLite`'s prepared-statement API for
//! programs that own a single connection: compile, bind, step, decode, with
//! a statement cache and a bounded busy-retry policy in the loop.
//!
//! The error model is deliberate: execution entry points return `Option` or
//! `bool`, and an absent result *is* the failure signal. Details go to a
//! pluggable [`DiagnosticSink`] (the default forwards to `tracing`), and the
//! engine's own code and message stay readable through
//! [`Connection::last_error_code`] and [`Connection::last_error_message`].
//!
//! A connection and everything it hands out stay on one thread; none of the
//! types are `Send`. Cursors borrow both the connection and the argument
//! slice they were bound from, so text and blob arguments are handed to the
//! engine by reference, without copies.
//!
//! ```rust
//! use sqlite_direct::{Connection, params};
//!
//! let mut conn = Connection::memory();
//! assert!(conn.open());
//! conn.set_statement_caching(true);
//! assert!(conn.execute_batch("CREATE TABLE people (name TEXT, age INTEGER)"));
//! assert!(conn.execute(
//!     "INSERT INTO people (name, age) VALUES (?, ?)",
//!     params!["alice", 34_i64],
//! ));
//! let mut rows = conn.query("SELECT name, age FROM people", &[]).unwrap();
//! while rows.next_row() {
//!     let name = rows.column_text(0).unwrap();
//!     let age = rows.value_named("age");
//!     println!("{name}: {age:?}");
//! }
//! ```
//!
//! All `unsafe` lives in one internal module; everything else works through
//! safe wrappers that own the raw engine handles.

mod cache;
mod connection;
mod cursor;
mod diagnostics;
mod error;
mod ffi;
mod params;
mod statement;
mod types;

pub use connection::{Connection, OpenFlags};
pub use cursor::{Cursor, Step};
pub use diagnostics::{DiagnosticSink, MemorySink, Severity, TracingSink};
pub use types::Value;
