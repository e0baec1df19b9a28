use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// Values that can be bound to a statement parameter or decoded from a
/// result column.
///
/// One enum serves both directions so helpers never branch on separate
/// bind/read types:
/// ```rust
/// use sqlite_direct::Value;
///
/// let args = vec![
///     Value::Int(1),
///     Value::Text("alice".into()),
///     Value::Bool(true),
/// ];
/// # let _ = args;
/// ```
/// Columns decode to the engine's storage classes only: `BigInt`, `Double`,
/// `Text`, `Blob`, or `Null`. The remaining variants exist for binding and
/// are narrowed or widened on the way in (see the per-variant notes).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    BigInt(i64),
    /// 32-bit unsigned integer; widens losslessly to the engine's 64-bit
    /// signed representation
    UInt(u32),
    /// 64-bit unsigned integer; reinterpreted two's-complement into the
    /// engine's 64-bit signed representation
    BigUInt(u64),
    /// Single-precision float; promoted to double before binding
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Boolean; stored as integer 0/1
    Bool(bool),
    /// UTF-8 text
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Timestamp; bound as a double holding seconds since the Unix epoch,
    /// with microsecond precision
    Timestamp(DateTime<Utc>),
    /// JSON document; bound as its serialized text
    Json(JsonValue),
    /// SQL NULL
    Null,
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view over every integer-shaped variant, widened/narrowed the
    /// same way binding would.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::UInt(v) => Some(i64::from(*v)),
            Value::BigUInt(v) => Some(*v as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(value) = self {
            Some(*value)
        } else {
            self.as_i64().map(|i| i != 0)
        }
    }

    /// Timestamp view. A `Double` coerces through its epoch-seconds reading,
    /// which is how timestamps come back from the engine.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(value) => Some(*value),
            Value::Double(secs) => epoch_seconds_to_timestamp(*secs),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let Value::Json(doc) = self {
            Some(doc)
        } else {
            None
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::BigUInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Convenience macro for building parameter lists.
///
/// Usage: `db.execute(sql, params![1_i64, "text", blob.as_slice()])`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$($crate::Value::from($val)),*]
    };
}

/// Epoch-seconds encoding used when binding a timestamp.
pub(crate) fn timestamp_to_epoch_seconds(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_micros()) / 1_000_000.0
}

/// Inverse of [`timestamp_to_epoch_seconds`]; `None` when the double cannot
/// represent a valid instant.
pub(crate) fn epoch_seconds_to_timestamp(secs: f64) -> Option<DateTime<Utc>> {
    let micros = (secs * 1_000_000.0).round();
    if !micros.is_finite() || micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_round_trip_preserves_micros() {
        let ts = DateTime::from_timestamp_micros(1_724_572_800_123_456).unwrap();
        let secs = timestamp_to_epoch_seconds(&ts);
        assert_eq!(epoch_seconds_to_timestamp(secs), Some(ts));
    }

    #[test]
    fn epoch_handles_pre_unix_instants() {
        let ts = DateTime::from_timestamp_micros(-86_400_000_000).unwrap();
        let secs = timestamp_to_epoch_seconds(&ts);
        assert_eq!(secs, -86_400.0);
        assert_eq!(epoch_seconds_to_timestamp(secs), Some(ts));
    }

    #[test]
    fn bool_coerces_from_integers() {
        assert_eq!(Value::Int(1).as_bool(), Some(true));
        assert_eq!(Value::BigInt(0).as_bool(), Some(false));
        assert_eq!(Value::Text("1".into()).as_bool(), None);
    }

    #[test]
    fn optional_values_become_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7_i64)), Value::BigInt(7));
    }
}
