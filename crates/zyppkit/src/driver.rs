//! Command driver abstraction for external tool invocation.
//!
//! The [`CommandDriver`] trait is the seam between the reconciliation core
//! and the host: it runs an argv and hands back exit code and captured
//! output, nothing more. It must not interpret package semantics, which
//! keeps the core testable against a recording mock.

use crate::error::{Error, Result};
use std::process::Command;

/// Captured result of one external process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code (-1 when killed by a signal)
    pub rc: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// An rc-zero output with no captured text.
    pub fn success() -> Self {
        Self::default()
    }
}

/// Driver trait for external process execution.
///
/// Implementations run `argv[0]` with the remaining elements as arguments
/// and wait for exit. With `check_rc` a non-zero exit becomes
/// [`Error::CommandFailed`]; otherwise the exit code is handed back for the
/// caller to judge.
pub trait CommandDriver: Send + Sync {
    /// Run a command and capture its output.
    fn run(&self, argv: &[String], check_rc: bool) -> Result<CommandOutput>;
}

/// Driver that executes real processes on the host.
#[derive(Debug, Default)]
pub struct SystemDriver;

impl SystemDriver {
    /// Create a new system driver.
    pub fn new() -> Self {
        Self
    }
}

impl CommandDriver for SystemDriver {
    fn run(&self, argv: &[String], check_rc: bool) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::CommandFailed {
            message: "empty argv".to_string(),
            stderr: String::new(),
        })?;

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute {program}: {e}"),
                stderr: String::new(),
            })?;

        let result = CommandOutput {
            rc: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if check_rc && result.rc != 0 {
            return Err(Error::CommandFailed {
                message: format!("{program} exited with code {}", result.rc),
                stderr: result.stderr,
            });
        }

        Ok(result)
    }
}
