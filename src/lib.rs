// src/lib.rs

//! find-prereqs
//!
//! Expands a list of prerequisite package names into the full set of
//! installed packages they transitively depend on, using the host's RPM or
//! dpkg database.
//!
//! # Architecture
//!
//! - One bulk query: every installed package is loaded up front
//! - Capability layer: RPM requirements are translated to packages in
//!   batches and memoized
//! - Worklist expansion: depth is the depth of first discovery

pub mod capability;
pub mod cli;
pub mod commands;
pub mod config;
mod error;
pub mod packages;
pub mod platform;
pub mod progress;
pub mod resolver;

pub use capability::{CacheStats, CapabilityCache, CapabilityMap};
pub use config::Config;
pub use error::{Error, Result};
pub use packages::{
    PackageDatabase, PackageManagerAdapter, PackageManagerKind, PackageOracle, PackageRecord,
    SystemOracle,
};
pub use platform::OsRelease;
pub use progress::{ProgressTracker, SilentProgress, SpinnerProgress};
pub use resolver::{
    Closure, ClosureReport, DependencyClosure, ExpandOptions, RenderOptions, Requirer, ResultView,
};
