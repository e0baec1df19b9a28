//! Parameter binding: dispatch from [`Value`] to the engine's bind
//! primitives, for positional (`?`) and named (`:name`) placeholders.

use std::ffi::CString;

use crate::error::SqliteDirectError;
use crate::ffi::{RawStatement, SQLITE_OK};
use crate::types::{self, Value};

/// Arguments for one execution. The two shapes are mutually exclusive by
/// construction; the named form wins at the public surface by having its own
/// entry points.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Args<'a> {
    Positional(&'a [Value]),
    Named(&'a [(&'a str, Value)]),
}

/// Bind every argument, then require that the number of successfully bound
/// parameters equals the statement's placeholder count. Unbound placeholders
/// default to NULL inside the engine, so a short bind must never execute.
pub(crate) fn bind_args(stmt: &RawStatement, args: &Args<'_>) -> Result<(), SqliteDirectError> {
    let expected = stmt.parameter_count();
    let mut bound = 0usize;
    match args {
        Args::Positional(values) => {
            for (i, value) in values.iter().enumerate() {
                if bind_value(stmt, i + 1, value) == SQLITE_OK {
                    bound += 1;
                }
            }
        }
        Args::Named(pairs) => {
            for (name, value) in *pairs {
                let idx = resolve_named(stmt, name).ok_or_else(|| {
                    SqliteDirectError::UnknownParameter {
                        name: (*name).to_string(),
                    }
                })?;
                if bind_value(stmt, idx, value) == SQLITE_OK {
                    bound += 1;
                }
            }
        }
    }
    if bound != expected {
        return Err(SqliteDirectError::ParameterCount { expected, bound });
    }
    Ok(())
}

/// Placeholder lookup for a bare name; the engine key carries the `:` prefix.
fn resolve_named(stmt: &RawStatement, name: &str) -> Option<usize> {
    let key = CString::new(format!(":{name}")).ok()?;
    stmt.parameter_index(&key)
}

/// One engine call per value, chosen by type class. No error surfaces here;
/// a non-OK status shows up as a missing count in [`bind_args`].
fn bind_value(stmt: &RawStatement, idx: usize, value: &Value) -> i32 {
    match value {
        Value::Int(v) => stmt.bind_i32(idx, *v),
        Value::BigInt(v) => stmt.bind_i64(idx, *v),
        Value::UInt(v) => stmt.bind_i64(idx, i64::from(*v)),
        Value::BigUInt(v) => stmt.bind_i64(idx, *v as i64),
        Value::Float(v) => stmt.bind_f64(idx, f64::from(*v)),
        Value::Double(v) => stmt.bind_f64(idx, *v),
        Value::Bool(v) => stmt.bind_i32(idx, i32::from(*v)),
        Value::Text(s) => stmt.bind_static_text(idx, s),
        Value::Blob(b) => stmt.bind_static_blob(idx, b),
        Value::Timestamp(ts) => stmt.bind_f64(idx, types::timestamp_to_epoch_seconds(ts)),
        Value::Json(doc) => stmt.bind_transient_text(idx, &doc.to_string()),
        Value::Null => stmt.bind_null(idx),
    }
}
