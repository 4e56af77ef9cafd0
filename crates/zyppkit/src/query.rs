//! Installed-state query via the rpm database.
//!
//! One batched `rpm -q` invocation answers for all requested names. rpm
//! does not guarantee one output line per request in request order (missing
//! packages produce a "not installed" line, and scan order is rpm's own),
//! so lines are correlated back to the requested names by the package name
//! parsed out of each line — never positionally. A line naming a package
//! nobody asked about is a hard error rather than silent misattribution.

use crate::debug::DebugLog;
use crate::driver::CommandDriver;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Path of the rpm query tool.
pub const RPM_BIN: &str = "/bin/rpm";

const RPM_QUERY_FORMAT: &str =
    "package %{NAME} is installed version %{VERSION} release %{RELEASE}\n";

static RPM_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^package (?P<pkg>\S+) is installed version (?P<ver>\S+) release (?P<rel>\S+)$")
        .expect("rpm output regex is valid")
});

/// Installed version and release of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    /// Upstream version
    pub version: String,
    /// Packaging release qualifier
    pub release: String,
}

/// Installed state per requested package name; `None` means not installed.
pub type InstalledState = HashMap<String, Option<InstalledVersion>>;

/// Query the currently installed (version, release) of the given packages.
///
/// Issues exactly one rpm invocation for the whole batch. Names with no
/// matching output line map to `None`.
pub fn installed_state(
    driver: &dyn CommandDriver,
    names: &[String],
    log: &mut DebugLog,
) -> Result<InstalledState> {
    let mut argv = vec![
        RPM_BIN.to_string(),
        "-q".to_string(),
        "--qf".to_string(),
        RPM_QUERY_FORMAT.to_string(),
    ];
    argv.extend(names.iter().cloned());

    log.record(format!("rpm command: {argv:?}"));

    // rpm exits non-zero whenever any requested package is missing; that is
    // an answer, not a failure
    let output = driver.run(&argv, false)?;

    let mut state: InstalledState = names.iter().map(|n| (n.clone(), None)).collect();

    for line in output.stdout.lines() {
        let Some(captures) = RPM_LINE_RE.captures(line) else {
            // "package foo is not installed" and similar
            continue;
        };

        let name = &captures["pkg"];
        let Some(entry) = state.get_mut(name) else {
            return Err(Error::QueryCorrelation {
                name: name.to_string(),
            });
        };

        *entry = Some(InstalledVersion {
            version: captures["ver"].to_string(),
            release: captures["rel"].to_string(),
        });
    }

    Ok(state)
}
