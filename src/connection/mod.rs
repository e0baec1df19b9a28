mod convenience;
mod core;
mod dml;
mod select;
mod tx;

use std::time::Duration;

pub use core::{Connection, OpenFlags};

// Pause between busy/locked retries.
pub(crate) const BUSY_RETRY_SLEEP: Duration = Duration::from_micros(20);
