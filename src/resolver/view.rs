// src/resolver/view.rs

//! Read-only projections of a computed closure
//!
//! `ResultView` sorts members by name, optionally hides members deeper than
//! a limit, and renders either the plain text report or the serializable
//! `ClosureReport`.

use crate::resolver::closure::{Closure, Requirer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

/// Shown in place of a version for packages that aren't installed
pub const NOT_INSTALLED: &str = "!!! Not Installed !!!";

/// ANSI code used by `--color` without an explicit value
pub const DEFAULT_HIGHLIGHT: &str = "31;47";

/// One member of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    pub name: String,
    /// Empty when not installed
    pub version: String,
    /// Raw dependency tokens, `None` when not installed
    pub depends: Option<Vec<String>>,
}

/// The complete, serializable outcome of an expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureReport {
    /// Sorted by name
    pub members: Vec<MemberReport>,
    pub depth_of: BTreeMap<String, usize>,
    pub requirers: BTreeMap<String, BTreeSet<Requirer>>,
    pub seed_count: usize,
    pub max_depth: usize,
    /// Capabilities that nothing installed provides
    pub unresolved: Vec<String>,
}

/// Counts for the summary line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub seed_count: usize,
    pub max_depth: usize,
}

/// Text report switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// List the requirers under each package
    pub details: bool,
    /// Prefix each row with its depth
    pub levels: bool,
    /// `name, version` rows and no summary
    pub simple: bool,
    /// The closure was not expanded; omit depth from the summary
    pub flat: bool,
    /// ANSI code to highlight the not-installed marker with
    pub highlight: Option<String>,
}

/// Sorted, optionally depth-limited view over a closure
pub struct ResultView<'a> {
    closure: &'a Closure,
    max_depth: Option<usize>,
}

impl<'a> ResultView<'a> {
    pub fn new(closure: &'a Closure) -> Self {
        Self {
            closure,
            max_depth: None,
        }
    }

    /// Hide members deeper than `max_depth`
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn visible(&self, name: &str) -> bool {
        match (self.max_depth, self.closure.depth_of(name)) {
            (Some(max), Some(depth)) => depth <= max,
            _ => true,
        }
    }

    /// Visible member names, sorted
    pub fn sorted_members(&self) -> Vec<&'a str> {
        let mut members: Vec<&'a str> = self
            .closure
            .members()
            .filter(|name| self.visible(name))
            .collect();
        members.sort_unstable();
        members
    }

    /// Who required `name`, sorted with `TOP_LEVEL` first
    pub fn requirers_of(&self, name: &str) -> Vec<&'a Requirer> {
        self.closure
            .requirers_of(name)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.closure.depth_of(name)
    }

    pub fn summary(&self) -> Summary {
        let members = self.sorted_members();
        Summary {
            total: members.len(),
            seed_count: self.closure.seed_count(),
            max_depth: members
                .iter()
                .filter_map(|name| self.closure.depth_of(name))
                .max()
                .unwrap_or(0),
        }
    }

    pub fn report(&self) -> ClosureReport {
        let members = self.sorted_members();
        let summary = self.summary();

        ClosureReport {
            members: members
                .iter()
                .map(|name| {
                    let record = self.closure.record_of(name);
                    MemberReport {
                        name: name.to_string(),
                        version: record.map(|r| r.version.clone()).unwrap_or_default(),
                        depends: record.map(|r| r.dependency_tokens.clone()),
                    }
                })
                .collect(),
            depth_of: members
                .iter()
                .filter_map(|name| self.closure.depth_of(name).map(|d| (name.to_string(), d)))
                .collect(),
            requirers: members
                .iter()
                .filter_map(|name| {
                    self.closure
                        .requirers_of(name)
                        .map(|r| (name.to_string(), r.clone()))
                })
                .collect(),
            seed_count: summary.seed_count,
            max_depth: summary.max_depth,
            unresolved: self.closure.unresolved().iter().cloned().collect(),
        }
    }

    /// Write the text report
    pub fn render(&self, options: &RenderOptions, out: &mut dyn Write) -> io::Result<()> {
        let members = self.sorted_members();
        let name_width = members.iter().map(|m| m.len()).max().unwrap_or(0) + 1;
        let not_installed = match &options.highlight {
            Some(code) => {
                let code = if code.is_empty() { DEFAULT_HIGHLIGHT } else { code.as_str() };
                format!("\x1b[{}m{}\x1b[0m", code, NOT_INSTALLED)
            }
            None => NOT_INSTALLED.to_string(),
        };

        for name in &members {
            let version = match self.closure.record_of(name) {
                Some(record) => record.version.as_str(),
                None => not_installed.as_str(),
            };

            if options.levels {
                let depth = self.closure.depth_of(name).unwrap_or(0);
                if options.simple {
                    write!(out, "{:02}, ", depth)?;
                } else {
                    write!(out, "{:02} ", depth)?;
                }
            }

            if options.simple {
                writeln!(out, "{}, {}", name, version)?;
            } else {
                let dots = ".".repeat(name_width - name.len());
                writeln!(out, "{} {} {}", name, dots, version)?;
            }

            if options.details {
                for requirer in self.requirers_of(name) {
                    match requirer.package().and_then(|p| self.closure.record_of(p)) {
                        Some(record) => writeln!(out, "\t {} == {}", requirer, record.version)?,
                        None => writeln!(out, "\t {}", requirer)?,
                    }
                }
            }
        }

        if !options.simple {
            let summary = self.summary();
            write!(out, "Package count: {}", summary.total)?;
            if !options.flat {
                write!(
                    out,
                    " (Initial count: {}, max depth: {})",
                    summary.seed_count, summary.max_depth
                )?;
            }
            writeln!(out)?;
        }

        Ok(())
    }
}
