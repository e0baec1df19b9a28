//! One-value queries: run, read the first column of the first row, close.

use chrono::{DateTime, Utc};

use crate::types::Value;

use super::Connection;

impl Connection {
    /// First column of the first row as an integer. `None` when the query
    /// fails, returns no rows, or holds NULL there.
    #[must_use]
    pub fn i64_for_query(&self, sql: &str, args: &[Value]) -> Option<i64> {
        let mut cursor = self.query(sql, args)?;
        if cursor.next_row() { cursor.column_i64(0) } else { None }
    }

    #[must_use]
    pub fn f64_for_query(&self, sql: &str, args: &[Value]) -> Option<f64> {
        let mut cursor = self.query(sql, args)?;
        if cursor.next_row() { cursor.column_f64(0) } else { None }
    }

    #[must_use]
    pub fn bool_for_query(&self, sql: &str, args: &[Value]) -> Option<bool> {
        self.i64_for_query(sql, args).map(|v| v != 0)
    }

    #[must_use]
    pub fn string_for_query(&self, sql: &str, args: &[Value]) -> Option<String> {
        let mut cursor = self.query(sql, args)?;
        if cursor.next_row() { cursor.column_text(0) } else { None }
    }

    #[must_use]
    pub fn blob_for_query(&self, sql: &str, args: &[Value]) -> Option<Vec<u8>> {
        let mut cursor = self.query(sql, args)?;
        if cursor.next_row() { cursor.column_blob(0) } else { None }
    }

    #[must_use]
    pub fn timestamp_for_query(&self, sql: &str, args: &[Value]) -> Option<DateTime<Utc>> {
        let mut cursor = self.query(sql, args)?;
        if cursor.next_row() {
            cursor.column_timestamp(0)
        } else {
            None
        }
    }

    /// True if a table with this name (case-insensitively) exists in the
    /// schema.
    #[must_use]
    pub fn table_exists(&self, table: &str) -> bool {
        self.i64_for_query(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND lower(name) = lower(?)",
            &[Value::from(table)],
        )
        .is_some_and(|count| count > 0)
    }
}
