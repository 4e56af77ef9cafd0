//! Per-run debug log collector.
//!
//! Reconciliation records every external command it builds into this
//! collector so the caller can echo the lines in its result. Scoped to one
//! run; passed explicitly instead of living in global state.

/// Append-only debug log for a single reconciliation run.
#[derive(Debug, Default)]
pub struct DebugLog {
    lines: Vec<String>,
    to_stderr: bool,
}

impl DebugLog {
    /// Create a collector; with `to_stderr` each line is also mirrored to
    /// stderr as it is recorded.
    pub fn new(to_stderr: bool) -> Self {
        Self {
            lines: Vec::new(),
            to_stderr,
        }
    }

    /// Record one debug line.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.to_stderr {
            eprintln!("{message}");
        }
        self.lines.push(message);
    }

    /// The lines collected so far, in record order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the collector and take its lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
