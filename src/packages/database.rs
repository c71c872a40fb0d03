// src/packages/database.rs

//! In-memory package database
//!
//! `SystemOracle::load_all` asks the package manager about every installed
//! package exactly once. Afterwards all lookups are served from memory and
//! only capability translations ever go back to the package manager.

use crate::capability::CapabilityCache;
use crate::error::{Error, Result};
use crate::packages::manager::{PackageListing, PackageManagerAdapter, PackageManagerKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// One installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Raw dependency tokens: package names (dpkg) or capabilities (rpm)
    pub dependency_tokens: Vec<String>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>, dependency_tokens: Vec<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependency_tokens,
        }
    }
}

/// What the dependency closure needs from the package manager
pub trait PackageOracle {
    /// Fetch the record for `name`, or `NotFoundError` if it isn't installed
    fn lookup(&self, name: &str) -> Result<&PackageRecord>;

    /// Translate capability tokens into the packages providing them
    fn resolve_capabilities(&self, tokens: &[String]) -> Result<HashMap<String, Vec<String>>>;

    /// Whether dependency tokens need `resolve_capabilities` at all
    fn has_capability_layer(&self) -> bool;
}

/// Package records keyed by bare package name, plus declared provides
#[derive(Debug, Clone, Default)]
pub struct PackageDatabase {
    records: HashMap<String, PackageRecord>,
    provides: BTreeMap<String, BTreeSet<String>>,
}

impl PackageDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the database from a bulk listing
    pub fn from_listing(listing: PackageListing) -> Self {
        let mut db = Self::new();
        for record in listing.records {
            db.insert(record);
        }
        for (capability, package) in listing.provides {
            db.add_provide(capability, package);
        }
        db
    }

    /// Add a record
    ///
    /// Records without a version are known to the manager but not installed
    /// and are left out. A second record for the same name (several
    /// installed kernels, say) is merged into the first: versions are joined
    /// and dependency tokens unioned in order.
    pub fn insert(&mut self, record: PackageRecord) {
        if record.version.is_empty() {
            debug!("Skipping {}: no installed version", record.name);
            return;
        }

        match self.records.get_mut(&record.name) {
            Some(existing) => {
                debug!("Merging second record for {}", record.name);
                if !existing.version.split(", ").any(|v| v == record.version) {
                    existing.version.push_str(", ");
                    existing.version.push_str(&record.version);
                }
                for token in record.dependency_tokens {
                    if !existing.dependency_tokens.contains(&token) {
                        existing.dependency_tokens.push(token);
                    }
                }
            }
            None => {
                self.records.insert(record.name.clone(), record);
            }
        }
    }

    /// Record that `package` provides `capability`
    pub fn add_provide(&mut self, capability: impl Into<String>, package: impl Into<String>) {
        self.provides
            .entry(capability.into())
            .or_default()
            .insert(package.into());
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Declared provides: capability -> providing packages
    pub fn provides(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.provides
    }

    /// All records sorted by name
    pub fn sorted_records(&self) -> Vec<&PackageRecord> {
        let mut records: Vec<&PackageRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

/// The host package manager behind a loaded database
pub struct SystemOracle {
    adapter: Box<dyn PackageManagerAdapter>,
    database: PackageDatabase,
}

impl SystemOracle {
    /// Run the one bulk query and load every installed package
    ///
    /// Failure here is fatal: without the listing nothing can be resolved.
    pub fn load_all(adapter: Box<dyn PackageManagerAdapter>) -> Result<Self> {
        info!("Loading package database from {}", adapter.kind().program());
        let listing = adapter.list_all()?;
        let database = PackageDatabase::from_listing(listing);
        info!(
            "Loaded {} packages, {} declared capabilities",
            database.len(),
            database.provides().len()
        );
        if database.is_empty() {
            warn!("{} reported no installed packages", adapter.kind().program());
        }
        Ok(Self { adapter, database })
    }

    pub fn kind(&self) -> PackageManagerKind {
        self.adapter.kind()
    }

    pub fn database(&self) -> &PackageDatabase {
        &self.database
    }

    /// A capability cache suited to this package manager
    ///
    /// Preloaded from every package's provides when there is a capability
    /// layer, an identity pass-through otherwise.
    pub fn capability_cache(&self) -> CapabilityCache {
        if self.has_capability_layer() {
            CapabilityCache::preloaded(self.database.provides())
        } else {
            CapabilityCache::pass_through()
        }
    }
}

impl PackageOracle for SystemOracle {
    fn lookup(&self, name: &str) -> Result<&PackageRecord> {
        self.database
            .get(name)
            .ok_or_else(|| Error::NotFoundError(name.to_string()))
    }

    fn resolve_capabilities(&self, tokens: &[String]) -> Result<HashMap<String, Vec<String>>> {
        self.adapter.what_provides(tokens)
    }

    fn has_capability_layer(&self) -> bool {
        self.adapter.has_capability_layer()
    }
}
