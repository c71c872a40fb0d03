// src/resolver/mod.rs

//! Dependency closure computation and reporting
//!
//! `DependencyClosure` walks dependency edges discovered through a
//! `PackageOracle`; `ResultView` projects the resulting `Closure` for output.

mod closure;
mod view;

pub use closure::{Closure, ClosureNode, DependencyClosure, ExpandOptions, Requirer};
pub use view::{
    ClosureReport, MemberReport, RenderOptions, ResultView, Summary, DEFAULT_HIGHLIGHT,
    NOT_INSTALLED,
};
