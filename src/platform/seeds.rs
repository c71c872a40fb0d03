// src/platform/seeds.rs

//! Built-in prerequisite lists and seed input parsing
//!
//! Each distro ID maps to its package manager and an ordered list of
//! version filters. The first filter matching the start of `VERSION_ID`
//! picks the prerequisite list.

use crate::error::{Error, Result};
use crate::packages::PackageManagerKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

// From the SDK installation guide: CentOS 6, 7
const CENTOS: &[&str] = &[
    "make", "gcc", "gcc-c++", "libstdc++", "flex", "ncurses", "ncurses-devel", "autoconf",
    "libtool", "libtool-ltdl-devel", "m4", "kernel-devel", "numpy",
];

// Debian 6, 7
const DEBIAN: &[&str] = &[
    "build-essential", "flex", "libncurses5-dev", "automake", "libltdl-dev",
    "linux-headers-amd64", "python-numpy",
];

// Fedora 22, RHEL 7, 8
const FEDORA: &[&str] = &[
    "make", "gcc", "gcc-c++", "kernel", "libstdc++", "flex", "ncurses", "ncurses-devel",
    "autoconf", "automake", "libtool", "libtool-ltdl-devel", "m4", "kernel-devel",
];

// openSUSE 13.1, Leap 42.1
const OPENSUSE: &[&str] = &[
    "make", "gcc", "gcc-c++", "libstdc++6", "flex", "autoconf", "ncurses-devel", "automake",
    "libtool", "m4", "kernel-devel",
];

// Ubuntu 14.04 LTS
const UBUNTU: &[&str] = &[
    "build-essential", "flex", "libncurses5-dev", "automake", "libltdl-dev",
    "linux-headers-generic",
];

/// A version filter and the prerequisites it selects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFilter {
    /// Regex matched against the start of `VERSION_ID`
    pub version: String,
    pub prereqs: Vec<String>,
}

impl ReleaseFilter {
    fn new(version: &str, prereqs: &[&str]) -> Self {
        Self {
            version: version.to_string(),
            prereqs: prereqs.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn regex(&self) -> Result<Regex> {
        Ok(Regex::new(&format!("^(?:{})", self.version))?)
    }

    pub fn matches(&self, version_id: &str) -> Result<bool> {
        Ok(self.regex()?.is_match(version_id))
    }
}

/// How to find prerequisites on one distro
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroEntry {
    pub package_manager: PackageManagerKind,
    #[serde(default)]
    pub releases: Vec<ReleaseFilter>,
}

impl DistroEntry {
    fn new(package_manager: PackageManagerKind, releases: Vec<ReleaseFilter>) -> Self {
        Self {
            package_manager,
            releases,
        }
    }

    /// Prerequisites for `version_id`, from the first matching filter
    pub fn prereqs_for(&self, version_id: &str) -> Result<Option<&[String]>> {
        for release in &self.releases {
            if release.matches(version_id)? {
                return Ok(Some(&release.prereqs));
            }
        }
        Ok(None)
    }

    /// Fail on any filter that isn't a valid regex
    pub fn validate(&self) -> Result<()> {
        for release in &self.releases {
            release.regex()?;
        }
        Ok(())
    }
}

/// The compiled-in distro table
pub fn builtin_distros() -> BTreeMap<String, DistroEntry> {
    use PackageManagerKind::{Dpkg, Rpm};

    let mut distros = BTreeMap::new();
    distros.insert(
        "centos".to_string(),
        DistroEntry::new(
            Rpm,
            vec![
                ReleaseFilter::new(r"6(\..*)?", CENTOS),
                ReleaseFilter::new(r"7(\..*)?", CENTOS),
                ReleaseFilter::new(r".*", CENTOS),
            ],
        ),
    );
    distros.insert(
        "debian".to_string(),
        DistroEntry::new(
            Dpkg,
            vec![
                ReleaseFilter::new(r"6(\..*)?", DEBIAN),
                ReleaseFilter::new(r"7(\..*)?", DEBIAN),
                ReleaseFilter::new(r".*", DEBIAN),
            ],
        ),
    );
    distros.insert(
        "rhel".to_string(),
        DistroEntry::new(
            Rpm,
            vec![
                ReleaseFilter::new(r"7(\..*)?", FEDORA),
                ReleaseFilter::new(r"8(\..*)?", FEDORA),
                ReleaseFilter::new(r".*", FEDORA),
            ],
        ),
    );
    distros.insert(
        "fedora".to_string(),
        DistroEntry::new(
            Rpm,
            vec![
                ReleaseFilter::new(r"22(\..*)?", FEDORA),
                ReleaseFilter::new(r".*", FEDORA),
            ],
        ),
    );
    distros.insert(
        "opensuse".to_string(),
        DistroEntry::new(
            Rpm,
            vec![
                ReleaseFilter::new(r"13\.1", OPENSUSE),
                ReleaseFilter::new(r".*", OPENSUSE),
            ],
        ),
    );
    distros.insert(
        "leap".to_string(),
        DistroEntry::new(
            Rpm,
            vec![
                ReleaseFilter::new(r"42\.1", OPENSUSE),
                ReleaseFilter::new(r".*", OPENSUSE),
            ],
        ),
    );
    distros.insert(
        "ubuntu".to_string(),
        DistroEntry::new(
            Dpkg,
            vec![
                ReleaseFilter::new(r"14\.04", UBUNTU),
                ReleaseFilter::new(r".*", UBUNTU),
            ],
        ),
    );
    distros
}

/// One package name per line; whitespace and trailing slashes are trimmed
pub fn parse_seed_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_end_matches('/').trim_end())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read seeds from a file, or from stdin when `source` is `-`
pub fn read_seed_source(source: &str) -> Result<Vec<String>> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(Path::new(source)).map_err(|e| {
            Error::ConfigError(format!("Failed to read prerequisites from {}: {}", source, e))
        })?
    };
    Ok(parse_seed_list(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_filter_wins() {
        let entry = DistroEntry::new(
            PackageManagerKind::Rpm,
            vec![
                ReleaseFilter::new(r"7(\..*)?", &["seven"]),
                ReleaseFilter::new(r".*", &["any"]),
            ],
        );
        assert_eq!(entry.prereqs_for("7.2").unwrap().unwrap(), &["seven".to_string()][..]);
        assert_eq!(entry.prereqs_for("8").unwrap().unwrap(), &["any".to_string()][..]);
    }

    #[test]
    fn test_filters_anchor_at_start() {
        let entry = DistroEntry::new(
            PackageManagerKind::Dpkg,
            vec![ReleaseFilter::new(r"14\.04", &["trusty"])],
        );
        assert!(entry.prereqs_for("14.04").unwrap().is_some());
        assert!(entry.prereqs_for("16.04").unwrap().is_none());
        assert!(entry.prereqs_for("114.04").unwrap().is_none());
    }

    #[test]
    fn test_builtin_table() {
        let distros = builtin_distros();
        assert_eq!(distros.len(), 7);
        assert_eq!(distros["ubuntu"].package_manager, PackageManagerKind::Dpkg);
        assert_eq!(distros["leap"].package_manager, PackageManagerKind::Rpm);
        let rhel = distros["rhel"].prereqs_for("7.2").unwrap().unwrap();
        assert!(rhel.contains(&"kernel-devel".to_string()));
        for entry in distros.values() {
            entry.validate().unwrap();
        }
    }

    #[test]
    fn test_invalid_filter_is_error() {
        let entry = DistroEntry::new(PackageManagerKind::Rpm, vec![ReleaseFilter::new("(", &[])]);
        assert!(matches!(entry.validate(), Err(Error::Regex(_))));
    }

    #[test]
    fn test_parse_seed_list() {
        let seeds = parse_seed_list("  make\ngcc/\n\n\tflex //\n");
        assert_eq!(seeds, vec!["make", "gcc", "flex"]);
    }

    #[test]
    fn test_read_seed_source_missing_file() {
        let err = read_seed_source("/nonexistent/prereqs.txt").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
