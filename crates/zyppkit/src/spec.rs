//! Package specifier parsing and matching.
//!
//! A specifier names a package and optionally pins an exact version and
//! release: `nmap`, `nmap=4.75` or `nmap=4.75-1.30`. Comparison operators
//! other than `=` are recognized by the grammar but rejected at parse time;
//! only exact pinning is supported.

use crate::error::{Error, Result};
use crate::query::InstalledVersion;
use crate::version;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

// e.g. my-package-name
//      my-package-name=1.2.3
//      my-package-name=1.2.3.4-1.0
static SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<pkg>[^=><]+)(?P<op>>=|<=|=|>|<)?(?P<ver>[^-]+)?-?(?P<rel>.+)?$")
        .expect("specifier grammar regex is valid")
});

/// The only comparison operator a specifier may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecOperator {
    /// Exact version match
    Equal,
}

/// A parsed package specifier.
///
/// Immutable after construction; created once per declared package and
/// consumed by matching and command-building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// The raw specifier exactly as given; the mutation tool is the only
    /// component that understands this composite form
    pub raw: String,
    /// Package name
    pub name: String,
    /// Present only when the specifier pins a version
    pub op: Option<SpecOperator>,
    /// Pinned version, if any
    pub version: Option<String>,
    /// Pinned release, if any (only possible alongside a version)
    pub release: Option<String>,
}

impl PackageSpec {
    /// Parse a raw specifier string.
    ///
    /// A name with embedded `-` but no operator is captured whole: the
    /// release split only applies once a version has been recognized.
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = SPEC_RE.captures(raw).ok_or_else(|| Error::InvalidSpec {
            spec: raw.to_string(),
        })?;

        let name = captures
            .name("pkg")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        if name.trim().is_empty() {
            return Err(Error::EmptyName {
                spec: raw.to_string(),
            });
        }

        let op = match captures.name("op").map(|m| m.as_str()) {
            None => None,
            Some("=") => Some(SpecOperator::Equal),
            Some(other) => {
                return Err(Error::UnsupportedOperator {
                    op: other.to_string(),
                    spec: raw.to_string(),
                });
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            name,
            op,
            version: captures.name("ver").map(|m| m.as_str().to_string()),
            release: captures.name("rel").map(|m| m.as_str().to_string()),
        })
    }

    /// Whether the installed state satisfies this specifier.
    ///
    /// Name match is assumed to have been established by the caller via map
    /// lookup; this only judges version compatibility. A spec without a
    /// version is satisfied by any installed state. A pinned release is
    /// only consulted when the spec carried one, so `pkg=2.0` matches any
    /// release of version 2.0.
    pub fn satisfies(&self, installed: Option<&InstalledVersion>) -> bool {
        let (want_ver, want_rel) = match (&self.version, &self.release) {
            (None, _) => return true,
            (Some(v), r) => (v, r.as_ref()),
        };

        let Some(have) = installed else {
            return false;
        };

        let matched = match want_rel {
            Some(rel) => version::compare(
                &format!("{want_ver}-{rel}"),
                &format!("{}-{}", have.version, have.release),
            ),
            None => version::compare(want_ver, &have.version),
        };

        matched == Ordering::Equal
    }
}
