//! # zyppkit
//!
//! Pure Rust library for reconciling the installed-package state of a
//! SUSE/openSUSE host against a declared desired state.
//!
//! This crate provides:
//! - Package specifier parsing (`name`, `name=version`, `name=version-release`)
//! - A segmented version comparator approximating rpm ordering
//! - Batched installed-state queries over the rpm database
//! - The present / absent / latest reconciliation engine driving zypper
//!
//! External tools are reached through the [`CommandDriver`] trait, so the
//! whole engine runs against a mock in tests.
//!
//! ## Example
//!
//! ```no_run
//! use zyppkit::{DebugLog, DesiredState, ReconcileOptions, Reconciler};
//!
//! let reconciler = Reconciler::new(ReconcileOptions::default());
//! let mut log = DebugLog::new(false);
//!
//! let packages = vec!["nmap".to_string(), "wireshark=1.10.13".to_string()];
//! let changed = reconciler
//!     .run(DesiredState::Present, &packages, &mut log)
//!     .expect("reconciliation failed");
//! println!("changed: {changed}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod debug;
pub mod driver;
pub mod error;
pub mod query;
pub mod reconcile;
pub mod report;
pub mod spec;
pub mod version;

pub use debug::DebugLog;
pub use driver::{CommandDriver, CommandOutput, SystemDriver};
pub use error::{Error, Result};
pub use query::{InstalledState, InstalledVersion};
pub use reconcile::{DesiredState, Outcome, ReconcileOptions};
pub use report::{FailureReport, RunReport};
pub use spec::{PackageSpec, SpecOperator};

/// High-level entry point for one reconciliation run.
///
/// Wraps a driver and the run options; [`Reconciler::run`] performs the
/// whole sequence: parse specifiers, probe the tool, query installed state,
/// reconcile, and verify the post-run state.
pub struct Reconciler {
    driver: Box<dyn CommandDriver>,
    options: ReconcileOptions,
}

impl Reconciler {
    /// Create a reconciler that executes real processes on the host.
    pub fn new(options: ReconcileOptions) -> Self {
        Self::with_driver(Box::new(SystemDriver::new()), options)
    }

    /// Create a reconciler with a custom driver (useful for testing).
    pub fn with_driver(driver: Box<dyn CommandDriver>, options: ReconcileOptions) -> Self {
        Self { driver, options }
    }

    /// Drive installed state toward `state` for the declared `packages`.
    ///
    /// Returns whether anything changed. Specifier parse errors abort
    /// before any external call; a non-zero exit from the mutation call is
    /// terminal and surfaces as [`Error::MutationFailed`] carrying the
    /// tool's own diagnostic text.
    pub fn run(
        &self,
        state: DesiredState,
        packages: &[String],
        log: &mut DebugLog,
    ) -> Result<bool> {
        let specs = packages
            .iter()
            .map(|raw| PackageSpec::parse(raw))
            .collect::<Result<Vec<_>>>()?;

        let driver = self.driver.as_ref();
        let legacy = reconcile::probe_legacy(driver, log)?;

        let names: Vec<String> = specs.iter().map(|spec| spec.name.clone()).collect();
        let installed = query::installed_state(driver, &names, log)?;
        log.record(format!("pre run versions: {installed:?}"));

        let outcome = match state {
            DesiredState::Present => {
                reconcile::ensure_present(driver, &specs, &installed, &self.options, legacy, log)?
            }
            DesiredState::Absent => {
                reconcile::ensure_absent(driver, &specs, &installed, &self.options, log)?
            }
            DesiredState::Latest => {
                reconcile::ensure_latest(driver, &specs, &installed, &self.options, legacy, log)?
            }
        };

        if outcome.rc != 0 {
            return Err(Error::MutationFailed {
                message: outcome.failure_message().to_string(),
            });
        }

        let post_run = query::installed_state(driver, &names, log)?;
        log.record(format!("post run versions: {post_run:?}"));

        Ok(outcome.changed)
    }
}
