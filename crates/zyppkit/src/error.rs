//! Error types for package reconciliation.
//!
//! Every error here is terminal for the run: the library favors a clear
//! all-or-nothing result over best-effort partial installs, so there is no
//! retry or partial-success reporting.

use thiserror::Error;

/// Errors that can occur while reconciling package state.
#[derive(Debug, Error)]
pub enum Error {
    /// Package specifier does not decompose under the specifier grammar
    #[error("invalid package spec: {spec}")]
    InvalidSpec {
        /// The raw specifier string as given by the caller
        spec: String,
    },

    /// Specifier carried a comparison operator other than `=`
    #[error("unsupported package spec operator {op} in {spec}")]
    UnsupportedOperator {
        /// The operator that was captured (e.g. `>=`)
        op: String,
        /// The raw specifier string as given by the caller
        spec: String,
    },

    /// Specifier has an empty package name
    #[error("empty package name in spec: {spec:?}")]
    EmptyName {
        /// The raw specifier string as given by the caller
        spec: String,
    },

    /// Query tool output named a package that was never requested
    #[error("package mismatch in query output (got {name})")]
    QueryCorrelation {
        /// The package name parsed from the stray output line
        name: String,
    },

    /// The mutation call exited non-zero; never retried
    #[error("{message}")]
    MutationFailed {
        /// The failing tool's own diagnostic text (stderr, or stdout if
        /// stderr was empty)
        message: String,
    },

    /// Command execution failed at the driver level
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
