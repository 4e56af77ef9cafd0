//! Structured run results for callers to serialize.

use serde::Serialize;

/// Successful run result: echoed inputs plus the authoritative changed flag.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The package specifiers exactly as declared
    pub name: Vec<String>,
    /// The requested desired state
    pub state: String,
    /// Whether installed package state changed
    pub changed: bool,
    /// Collected debug lines, when the caller asked for them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_output: Option<Vec<String>>,
}

/// Failure result carrying the failing tool's own diagnostic text.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    /// Always true; marks the result as a failure
    pub failed: bool,
    /// Diagnostic message for the user
    pub msg: String,
}

impl FailureReport {
    /// Build a failure report from a message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: msg.into(),
        }
    }
}
