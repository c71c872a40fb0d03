// src/packages/dpkg_query.rs

//! Query installed dpkg packages from the system database
//!
//! dpkg reports dependencies as package names, so there is no capability
//! layer: the bulk listing is all that is ever asked of `dpkg-query`.

use crate::error::{Error, Result};
use crate::packages::database::PackageRecord;
use crate::packages::exec::CommandRunner;
use crate::packages::manager::{PackageListing, PackageManagerAdapter, PackageManagerKind};
use std::collections::HashMap;
use tracing::{debug, warn};

/// dpkg-style package manager adapter
pub struct DpkgQuery {
    runner: Box<dyn CommandRunner>,
}

impl DpkgQuery {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Arguments of the bulk listing query
    pub fn bulk_args(&self) -> Vec<String> {
        vec![
            "--show".to_string(),
            "-f".to_string(),
            "${Package}\t${Version}\t${Depends}\n".to_string(),
        ]
    }

    /// Parse the complete output of the bulk query
    pub fn parse_listing(&self, output: &str) -> PackageListing {
        let mut listing = PackageListing::default();

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.splitn(3, '\t').collect();
            if fields.len() < 3 {
                warn!("Skipping malformed dpkg-query output line: {}", line);
                continue;
            }

            let name = strip_arch_qualifier(fields[0].trim());
            let depends = parse_depends(fields[2]);
            listing
                .records
                .push(PackageRecord::new(name, fields[1].to_string(), depends));
        }

        debug!("Parsed {} dpkg records", listing.records.len());
        listing
    }
}

impl PackageManagerAdapter for DpkgQuery {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Dpkg
    }

    fn list_all(&self) -> Result<PackageListing> {
        debug!("Querying all installed dpkg packages with depends");

        let output = self.runner.run("dpkg-query", &self.bulk_args())?;
        if !output.success {
            return Err(Error::OracleError(format!(
                "dpkg-query failed ({}): {}",
                output.status_text(),
                output.stderr.trim()
            )));
        }

        Ok(self.parse_listing(&output.stdout))
    }

    /// Identity: a dpkg dependency already names its package
    fn what_provides(&self, capabilities: &[String]) -> Result<HashMap<String, Vec<String>>> {
        Ok(capabilities
            .iter()
            .map(|c| (c.clone(), vec![c.clone()]))
            .collect())
    }
}

/// Parse a `${Depends}` field into bare package names
///
/// Of a set of alternatives (`a | b`) only the first is kept; version
/// constraints and multiarch qualifiers are dropped.
fn parse_depends(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter_map(|dep| dep.split_whitespace().next())
        .map(strip_arch_qualifier)
        .filter(|name| !name.is_empty())
        .collect()
}

/// `libc6:amd64` -> `libc6`, `python3:any` -> `python3`
fn strip_arch_qualifier(name: &str) -> String {
    name.split(':').next().unwrap_or(name).to_string()
}
