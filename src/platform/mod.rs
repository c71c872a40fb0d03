// src/platform/mod.rs

//! Host platform detection and the prerequisite seed table

mod os_release;
pub mod seeds;

pub use os_release::{OsRelease, OS_RELEASE_PATH};
pub use seeds::{builtin_distros, parse_seed_list, read_seed_source, DistroEntry, ReleaseFilter};
