// src/capability/mod.rs

//! Capability translation
//!
//! RPM dependencies name capabilities (`libc.so.6()(64bit)`, `/bin/sh`,
//! `perl(Carp)`) rather than packages. `CapabilityCache` turns them into
//! package names while keeping package manager round-trips to a minimum.

mod cache;

pub use cache::{CacheStats, CapabilityCache, CapabilityMap};
