//! Diagnostic routing.
//!
//! Nothing in this crate writes to the console. Every diagnostic a connection
//! or cursor produces goes through the [`DiagnosticSink`] installed on the
//! connection; the default sink forwards to `tracing` so ordinary programs get
//! structured log events, and tests can swap in a [`MemorySink`] to assert on
//! what was emitted.

use std::cell::RefCell;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Statement tracing (gated by the trace-execution toggle).
    Trace,
    /// Recoverable misuse, e.g. a rejected reentrant call.
    Warning,
    /// An execution failure; pairs with an absent result from the caller's
    /// point of view.
    Error,
}

/// Receiver for connection diagnostics.
pub trait DiagnosticSink {
    fn record(&self, severity: Severity, message: &str);
}

/// Default sink: forwards each event to `tracing` at a matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Trace => tracing::debug!(target: "sqlite_direct", "{message}"),
            Severity::Warning => tracing::warn!(target: "sqlite_direct", "{message}"),
            Severity::Error => tracing::error!(target: "sqlite_direct", "{message}"),
        }
    }
}

/// Sink that keeps every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<(Severity, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events.borrow().clone()
    }

    /// True if any recorded message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.events.borrow().iter().any(|(_, m)| m.contains(needle))
    }

    /// Number of events at `severity`.
    #[must_use]
    pub fn count_at(&self, severity: Severity) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, severity: Severity, message: &str) {
        self.events.borrow_mut().push((severity, message.to_string()));
    }
}
