// src/packages/mod.rs

//! Host package manager support
//!
//! Each supported manager (RPM, dpkg) implements `PackageManagerAdapter`.
//! `SystemOracle` loads the manager's database once and answers the
//! dependency closure's lookups from memory.

pub mod database;
pub mod dpkg_query;
pub mod exec;
pub mod manager;
pub mod rpm_query;

pub use database::{PackageDatabase, PackageOracle, PackageRecord, SystemOracle};
pub use exec::{CommandOutput, CommandRunner, SystemRunner};
pub use manager::{adapter_for, PackageListing, PackageManagerAdapter, PackageManagerKind};
