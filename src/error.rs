use thiserror::Error;

/// Internal error currency for the crate.
///
/// Execution entry points never return this type; they collapse it into the
/// absent-result signal (`None`/`false`) after routing the details to the
/// connection's diagnostic sink. Engine code and message also stay readable
/// through [`crate::Connection::last_error_code`] and
/// [`crate::Connection::last_error_message`].
#[derive(Debug, Error)]
pub(crate) enum SqliteDirectError {
    #[error("sqlite error {code}: {message}")]
    Engine { code: i32, message: String },

    #[error("connection is not open")]
    ConnectionClosed,

    #[error("a statement is already executing on this connection")]
    InFlight,

    #[error("busy retry limit reached after {attempts} attempts")]
    BusyTimeout { attempts: u32 },

    #[error("parameter count mismatch: statement expects {expected}, bound {bound}")]
    ParameterCount { expected: usize, bound: usize },

    #[error("unknown named parameter :{name}")]
    UnknownParameter { name: String },

    #[error("sql contained no statement")]
    EmptyStatement,

    #[error("string contains an interior nul byte")]
    InvalidString(#[from] std::ffi::NulError),
}
