//! The three-state reconciliation engine.
//!
//! Each operation is one-shot: it computes the delta between declared and
//! installed state, issues at most one mutating zypper invocation for the
//! whole batch, and decides whether anything actually changed. Non-zero
//! exit codes are never retried; the caller treats them as terminal.

use crate::debug::DebugLog;
use crate::driver::CommandDriver;
use crate::error::Result;
use crate::query::{self, InstalledState};
use crate::spec::PackageSpec;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Path of the zypper mutation tool.
pub const ZYPPER_BIN: &str = "/usr/bin/zypper";

/// Marker zypper prints in dry-run output when an upgrade is pending.
const UPGRADE_PENDING_MARKER: &str = "is going to be upgraded";

static ZYPPER_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"zypper\s+(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+)")
        .expect("zypper version regex is valid")
});

/// Target state a reconciliation run drives toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// Every declared specifier must be satisfied by an installed package
    Present,
    /// No declared package may remain installed
    Absent,
    /// Every declared package must be at the newest available version
    Latest,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Latest => "latest",
        };
        write!(f, "{s}")
    }
}

/// Typed reconciliation options, one field per recognized knob.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Pass `--no-gpg-checks` to skip package signature verification
    pub disable_gpg_check: bool,
    /// Pass `--no-recommends` so recommended packages are not pulled in
    /// (suppressed automatically on legacy zypper, which lacks the flag)
    pub disable_recommends: bool,
    /// Dry run: report what would change without mutating package state
    pub check_mode: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            disable_gpg_check: false,
            disable_recommends: true,
            check_mode: false,
        }
    }
}

/// Result of one reconciliation operation over the whole batch.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Exit code of the mutation call (0 when no call was needed)
    pub rc: i32,
    /// Captured stdout of the mutation call
    pub stdout: String,
    /// Captured stderr of the mutation call
    pub stderr: String,
    /// Whether installed state changed (the authoritative signal)
    pub changed: bool,
}

impl Outcome {
    /// Outcome for a batch that needed no mutation.
    fn unchanged() -> Self {
        Self {
            rc: 0,
            stdout: String::new(),
            stderr: String::new(),
            changed: false,
        }
    }

    /// Outcome for a check-mode run that would have mutated.
    fn would_change() -> Self {
        Self {
            changed: true,
            ..Self::unchanged()
        }
    }

    /// The failing tool's own diagnostic text: stderr, or stdout when
    /// stderr is empty.
    pub fn failure_message(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Probe the mutation tool version; major version 0 selects
/// legacy-compatibility mode (different upgrade verb, no `--no-recommends`).
pub fn probe_legacy(driver: &dyn CommandDriver, log: &mut DebugLog) -> Result<bool> {
    let argv = vec![ZYPPER_BIN.to_string(), "-V".to_string()];
    let output = driver.run(&argv, false)?;

    let text = if output.rc == 0 {
        &output.stdout
    } else {
        &output.stderr
    };
    log.record(format!("zypper version: {}", text.trim()));

    let legacy = ZYPPER_VERSION_RE
        .captures(text)
        .is_some_and(|c| c["major"].parse::<u32>().is_ok_and(|major| major == 0));
    Ok(legacy)
}

/// Make sure every specifier is satisfied by an installed package.
///
/// Specs that fail [`PackageSpec::satisfies`] form one install batch
/// carrying the raw specifiers verbatim; zypper is the only component that
/// understands the composite `name=version-release` form. An empty batch
/// issues no call and reports no change.
pub fn ensure_present(
    driver: &dyn CommandDriver,
    specs: &[PackageSpec],
    installed: &InstalledState,
    options: &ReconcileOptions,
    legacy_zypper: bool,
    log: &mut DebugLog,
) -> Result<Outcome> {
    let to_install: Vec<&str> = specs
        .iter()
        .filter(|spec| {
            let state = installed.get(&spec.name).and_then(Option::as_ref);
            !spec.satisfies(state)
        })
        .map(|spec| spec.raw.as_str())
        .collect();

    if to_install.is_empty() {
        return Ok(Outcome::unchanged());
    }

    let mut argv = vec![ZYPPER_BIN.to_string(), "--non-interactive".to_string()];
    // global options go before the zypper command word
    if options.disable_gpg_check {
        argv.push("--no-gpg-checks".to_string());
    }
    argv.push("install".to_string());
    argv.push("--auto-agree-with-licenses".to_string());
    if options.disable_recommends && !legacy_zypper {
        argv.push("--no-recommends".to_string());
    }
    argv.extend(to_install.iter().map(|s| (*s).to_string()));

    log.record(format!("zypper install command: {argv:?}"));

    if options.check_mode {
        return Ok(Outcome::would_change());
    }

    let output = driver.run(&argv, false)?;
    Ok(Outcome {
        changed: output.rc == 0,
        rc: output.rc,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Make sure every declared package is at the newest available version.
///
/// Runs [`ensure_present`] first. When that already changed something, the
/// install is assumed to have brought the packages up to date and no
/// further change detection runs; this is a known approximation carried
/// over from the tool's history, not a proven invariant. Otherwise change
/// is detected by comparing installed-version snapshots taken before and
/// after the upgrade call. Upgrade batches carry bare package names only;
/// version pins are meaningless for "latest".
pub fn ensure_latest(
    driver: &dyn CommandDriver,
    specs: &[PackageSpec],
    installed: &InstalledState,
    options: &ReconcileOptions,
    legacy_zypper: bool,
    log: &mut DebugLog,
) -> Result<Outcome> {
    let present = ensure_present(driver, specs, installed, options, legacy_zypper, log)?;
    if present.rc != 0 {
        // terminal for the run; the upgrade call would only mask the failure
        return Ok(present);
    }
    let mut changed = present.changed;

    let names: Vec<String> = specs.iter().map(|spec| spec.name.clone()).collect();

    let pre_upgrade = if changed || options.check_mode {
        None
    } else {
        Some(query::installed_state(driver, &names, log)?)
    };

    let mut argv = vec![ZYPPER_BIN.to_string(), "--non-interactive".to_string()];
    if options.disable_gpg_check {
        argv.push("--no-gpg-checks".to_string());
    }
    // legacy zypper has no update verb worth using
    if legacy_zypper {
        argv.push("install".to_string());
    } else {
        argv.push("update".to_string());
    }
    argv.push("--auto-agree-with-licenses".to_string());
    if options.check_mode {
        argv.push("--dry-run".to_string());
    }
    argv.extend(names.iter().cloned());

    log.record(format!("zypper latest command: {argv:?}"));

    let output = driver.run(&argv, false)?;

    if options.check_mode {
        if !changed {
            changed = output.stdout.contains(UPGRADE_PENDING_MARKER);
        }
    } else if let Some(pre_upgrade) = pre_upgrade {
        let post_upgrade = query::installed_state(driver, &names, log)?;
        changed = pre_upgrade != post_upgrade;
    }

    Ok(Outcome {
        changed,
        rc: output.rc,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Make sure none of the declared packages remain installed.
///
/// Removal batches carry bare names of whatever is currently installed; a
/// version-pinned specifier still removes the package wholesale.
pub fn ensure_absent(
    driver: &dyn CommandDriver,
    specs: &[PackageSpec],
    installed: &InstalledState,
    options: &ReconcileOptions,
    log: &mut DebugLog,
) -> Result<Outcome> {
    let to_remove: Vec<&str> = specs
        .iter()
        .filter(|spec| {
            installed
                .get(&spec.name)
                .is_some_and(|state| state.is_some())
        })
        .map(|spec| spec.name.as_str())
        .collect();

    if to_remove.is_empty() {
        return Ok(Outcome::unchanged());
    }

    let mut argv = vec![
        ZYPPER_BIN.to_string(),
        "--non-interactive".to_string(),
        "remove".to_string(),
    ];
    argv.extend(to_remove.iter().map(|s| (*s).to_string()));

    log.record(format!("zypper remove command: {argv:?}"));

    if options.check_mode {
        return Ok(Outcome::would_change());
    }

    let output = driver.run(&argv, false)?;
    Ok(Outcome {
        changed: output.rc == 0,
        rc: output.rc,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockDriver;
    use crate::driver::CommandOutput;
    use crate::query::InstalledVersion;

    fn specs(raw: &[&str]) -> Vec<PackageSpec> {
        raw.iter().map(|s| PackageSpec::parse(s).unwrap()).collect()
    }

    fn state(entries: &[(&str, Option<(&str, &str)>)]) -> InstalledState {
        entries
            .iter()
            .map(|(name, version)| {
                (
                    (*name).to_string(),
                    version.map(|(v, r)| InstalledVersion {
                        version: v.to_string(),
                        release: r.to_string(),
                    }),
                )
            })
            .collect()
    }

    fn opts() -> ReconcileOptions {
        ReconcileOptions::default()
    }

    #[test]
    fn present_with_everything_satisfied_issues_no_call() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("nmap", Some(("4.75", "1.30")))]);

        let outcome = ensure_present(
            &driver,
            &specs(&["nmap"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.rc, 0);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn present_installs_missing_with_raw_specifier() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("foo", None)]);

        let outcome = ensure_present(
            &driver,
            &specs(&["foo=2.0"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        assert!(outcome.changed);
        let calls = driver.calls();
        assert_eq!(calls.len(), 1);
        let argv = &calls[0];
        assert_eq!(argv[0], ZYPPER_BIN);
        assert!(argv.contains(&"--non-interactive".to_string()));
        assert!(argv.contains(&"install".to_string()));
        assert!(argv.contains(&"--no-recommends".to_string()));
        // the composite specifier goes through verbatim
        assert_eq!(argv.last().unwrap(), "foo=2.0");
    }

    #[test]
    fn present_changed_tracks_exit_code() {
        let driver = MockDriver::new();
        driver.respond(CommandOutput {
            rc: 104,
            stdout: String::new(),
            stderr: "no provider of foo".to_string(),
        });
        let mut log = DebugLog::new(false);
        let installed = state(&[("foo", None)]);

        let outcome = ensure_present(
            &driver,
            &specs(&["foo"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.rc, 104);
        assert_eq!(outcome.failure_message(), "no provider of foo");
    }

    #[test]
    fn present_gpg_flag_precedes_command_word() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("foo", None)]);
        let options = ReconcileOptions {
            disable_gpg_check: true,
            ..opts()
        };

        ensure_present(
            &driver,
            &specs(&["foo"]),
            &installed,
            &options,
            false,
            &mut log,
        )
        .unwrap();

        let argv = &driver.calls()[0];
        let gpg = argv.iter().position(|a| a == "--no-gpg-checks").unwrap();
        let install = argv.iter().position(|a| a == "install").unwrap();
        assert!(gpg < install);
    }

    #[test]
    fn present_legacy_zypper_suppresses_no_recommends() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("foo", None)]);

        ensure_present(
            &driver,
            &specs(&["foo"]),
            &installed,
            &opts(),
            true,
            &mut log,
        )
        .unwrap();

        assert!(!driver.calls()[0].contains(&"--no-recommends".to_string()));
    }

    #[test]
    fn present_check_mode_reports_change_without_calling() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("foo", None)]);
        let options = ReconcileOptions {
            check_mode: true,
            ..opts()
        };

        let outcome = ensure_present(
            &driver,
            &specs(&["foo"]),
            &installed,
            &options,
            false,
            &mut log,
        )
        .unwrap();

        assert!(outcome.changed);
        assert!(driver.calls().is_empty());
        // the argv is still recorded for debugging
        assert!(log.lines().iter().any(|l| l.starts_with("zypper install")));
    }

    #[test]
    fn absent_with_nothing_installed_issues_no_call() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("bar", None)]);

        let outcome =
            ensure_absent(&driver, &specs(&["bar"]), &installed, &opts(), &mut log).unwrap();

        assert!(!outcome.changed);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn absent_removes_exactly_the_installed_names() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("bar", Some(("3.0", "1"))), ("baz", None)]);

        let outcome = ensure_absent(
            &driver,
            &specs(&["bar", "baz"]),
            &installed,
            &opts(),
            &mut log,
        )
        .unwrap();

        assert!(outcome.changed);
        let calls = driver.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                ZYPPER_BIN.to_string(),
                "--non-interactive".to_string(),
                "remove".to_string(),
                "bar".to_string(),
            ]
        );
    }

    #[test]
    fn latest_detects_change_via_snapshots() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        // already present at 1.0-1, so ensure_present does nothing
        let installed = state(&[("a", Some(("1.0", "1")))]);
        // pre-upgrade snapshot
        driver.respond_stdout("package a is installed version 1.0 release 1\n");
        // the update call itself
        driver.respond(CommandOutput::success());
        // post-upgrade snapshot shows a new version
        driver.respond_stdout("package a is installed version 1.1 release 1\n");

        let outcome = ensure_latest(
            &driver,
            &specs(&["a"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        assert!(outcome.changed);
        let update = &driver.calls()[1];
        assert!(update.contains(&"update".to_string()));
        assert_eq!(update.last().unwrap(), "a");
    }

    #[test]
    fn latest_without_version_movement_is_unchanged() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("a", Some(("1.0", "1")))]);
        driver.respond_stdout("package a is installed version 1.0 release 1\n");
        driver.respond(CommandOutput::success());
        driver.respond_stdout("package a is installed version 1.0 release 1\n");

        let outcome = ensure_latest(
            &driver,
            &specs(&["a"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        assert!(!outcome.changed);
    }

    #[test]
    fn latest_skips_detection_when_install_already_changed() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("a", None)]);
        // install call succeeds, then the upgrade call; no snapshot queries
        driver.respond(CommandOutput::success());
        driver.respond(CommandOutput::success());

        let outcome = ensure_latest(
            &driver,
            &specs(&["a"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        assert!(outcome.changed);
        // exactly two zypper calls and zero rpm snapshots
        assert_eq!(driver.calls().len(), 2);
        assert!(driver.calls_to(crate::query::RPM_BIN).is_empty());
    }

    #[test]
    fn latest_upgrade_batch_uses_bare_names() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("foo", Some(("2.0", "1")))]);
        driver.respond_stdout("package foo is installed version 2.0 release 1\n");
        driver.respond(CommandOutput::success());
        driver.respond_stdout("package foo is installed version 2.0 release 1\n");

        ensure_latest(
            &driver,
            &specs(&["foo=2.0"]),
            &installed,
            &opts(),
            false,
            &mut log,
        )
        .unwrap();

        let update = &driver.calls()[1];
        assert_eq!(update.last().unwrap(), "foo");
        assert!(!update.contains(&"foo=2.0".to_string()));
    }

    #[test]
    fn latest_check_mode_uses_dry_run_heuristic() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("a", Some(("1.0", "1")))]);
        driver.respond_stdout("The following package is going to be upgraded:\n  a\n");

        let options = ReconcileOptions {
            check_mode: true,
            ..opts()
        };
        let outcome = ensure_latest(
            &driver,
            &specs(&["a"]),
            &installed,
            &options,
            false,
            &mut log,
        )
        .unwrap();

        assert!(outcome.changed);
        let update = &driver.calls()[0];
        assert!(update.contains(&"--dry-run".to_string()));
        // no snapshots in check mode
        assert!(driver.calls_to(crate::query::RPM_BIN).is_empty());
    }

    #[test]
    fn latest_legacy_zypper_uses_install_verb() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        let installed = state(&[("a", Some(("1.0", "1")))]);
        driver.respond_stdout("package a is installed version 1.0 release 1\n");
        driver.respond(CommandOutput::success());
        driver.respond_stdout("package a is installed version 1.0 release 1\n");

        ensure_latest(
            &driver,
            &specs(&["a"]),
            &installed,
            &opts(),
            true,
            &mut log,
        )
        .unwrap();

        let upgrade = &driver.calls()[1];
        assert!(upgrade.contains(&"install".to_string()));
        assert!(!upgrade.contains(&"update".to_string()));
    }

    #[test]
    fn probe_detects_legacy_major_zero() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        driver.respond_stdout("zypper 0.6.104\n");
        assert!(probe_legacy(&driver, &mut log).unwrap());

        driver.respond_stdout("zypper 1.14.11\n");
        assert!(!probe_legacy(&driver, &mut log).unwrap());
    }

    #[test]
    fn probe_without_version_string_is_not_legacy() {
        let driver = MockDriver::new();
        let mut log = DebugLog::new(false);
        driver.respond(CommandOutput {
            rc: 127,
            stdout: String::new(),
            stderr: "command not found".to_string(),
        });
        assert!(!probe_legacy(&driver, &mut log).unwrap());
    }
}
