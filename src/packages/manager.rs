// src/packages/manager.rs

//! Host package manager selection
//!
//! The two supported managers differ in one important way: dpkg reports
//! dependencies as package names, while RPM reports capability tokens that
//! must be translated into the packages providing them. `PackageManagerAdapter`
//! hides the command lines and output formats; the capability layer is
//! surfaced through `has_capability_layer`.

use crate::error::Result;
use crate::packages::database::PackageRecord;
use crate::packages::dpkg_query::DpkgQuery;
use crate::packages::exec::CommandRunner;
use crate::packages::rpm_query::RpmQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use tracing::warn;

/// Supported host package managers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    Rpm,
    Dpkg,
}

impl PackageManagerKind {
    /// Whether dependency tokens name capabilities rather than packages
    pub fn has_capability_layer(&self) -> bool {
        matches!(self, Self::Rpm)
    }

    /// Program used for queries
    pub fn program(&self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Dpkg => "dpkg-query",
        }
    }
}

/// Everything learned from one bulk listing
#[derive(Debug, Clone, Default)]
pub struct PackageListing {
    /// One record per installed package, in listing order
    pub records: Vec<PackageRecord>,
    /// `(capability, package)` pairs from each package's declared provides
    pub provides: Vec<(String, String)>,
}

/// Query interface to the host package manager
pub trait PackageManagerAdapter {
    fn kind(&self) -> PackageManagerKind;

    /// Issue the single bulk query and parse every record
    fn list_all(&self) -> Result<PackageListing>;

    /// Resolve capability tokens to the installed packages providing them
    ///
    /// Every requested token is present in the result; tokens nothing
    /// provides map to an empty list.
    fn what_provides(&self, capabilities: &[String]) -> Result<HashMap<String, Vec<String>>>;

    fn has_capability_layer(&self) -> bool {
        self.kind().has_capability_layer()
    }
}

/// Build the adapter for `kind`, run through `runner`
pub fn adapter_for(
    kind: PackageManagerKind,
    runner: Box<dyn CommandRunner>,
    delimiter: &str,
) -> Box<dyn PackageManagerAdapter> {
    match kind {
        PackageManagerKind::Rpm => Box::new(RpmQuery::new(runner, delimiter, machine_arch())),
        PackageManagerKind::Dpkg => Box::new(DpkgQuery::new(runner)),
    }
}

/// Machine hardware name, as `uname -m` reports it
pub fn machine_arch() -> String {
    match nix::sys::utsname::uname() {
        Ok(uts) => uts.machine().to_string_lossy().into_owned(),
        Err(e) => {
            warn!("uname failed ({}), using build target arch", e);
            std::env::consts::ARCH.to_string()
        }
    }
}
