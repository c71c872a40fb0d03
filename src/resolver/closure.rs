// src/resolver/closure.rs

//! Transitive dependency closure
//!
//! Starting from a seed list, every member's dependency tokens are looked up,
//! translated through the capability cache and appended to the closure if
//! new. Members are processed strictly in insertion order from an explicit
//! worklist, so a member's recorded depth is the depth at which it was first
//! discovered and is never revised afterwards.

use crate::capability::CapabilityCache;
use crate::error::{Error, Result};
use crate::packages::{PackageOracle, PackageRecord};
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use tracing::{debug, trace};

/// Who pulled a package into the closure
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirer {
    /// The package is one of the seeds
    TopLevel,
    /// The package is a direct dependency of this member
    Package(String),
}

impl Requirer {
    pub const TOP_LEVEL: &'static str = "TOP_LEVEL";

    pub fn package(&self) -> Option<&str> {
        match self {
            Self::TopLevel => None,
            Self::Package(name) => Some(name),
        }
    }
}

impl fmt::Display for Requirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLevel => write!(f, "{}", Self::TOP_LEVEL),
            Self::Package(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for Requirer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-member bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureNode {
    /// Edges from the nearest seed, as first discovered (0 = seed)
    pub depth: usize,
    pub requirers: BTreeSet<Requirer>,
    /// `None` until looked up, and for packages that aren't installed
    pub record: Option<PackageRecord>,
}

impl ClosureNode {
    fn new(depth: usize, requirer: Requirer) -> Self {
        Self {
            depth,
            requirers: BTreeSet::from([requirer]),
            record: None,
        }
    }
}

/// An insertion-ordered set of packages with depth and requirer tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    order: Vec<String>,
    nodes: HashMap<String, ClosureNode>,
    seed_count: usize,
    unresolved: BTreeSet<String>,
}

impl Closure {
    /// Seed a closure; blank names are dropped and duplicates collapse
    pub fn from_seeds<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut closure = Self::default();
        for seed in seeds {
            let seed = seed.as_ref().trim();
            if seed.is_empty() || closure.nodes.contains_key(seed) {
                continue;
            }
            closure.order.push(seed.to_string());
            closure
                .nodes
                .insert(seed.to_string(), ClosureNode::new(0, Requirer::TopLevel));
        }
        closure.seed_count = closure.order.len();
        closure
    }

    /// Record that `from` depends on `to`
    ///
    /// Returns true when `to` is new to the closure. An existing member only
    /// gains a requirer; its depth stays as first recorded. A package
    /// depending on itself is listed among its own requirers.
    fn add_edge(&mut self, from: &str, to: &str) -> bool {
        if to.is_empty() {
            return false;
        }
        let requirer = Requirer::Package(from.to_string());

        if let Some(node) = self.nodes.get_mut(to) {
            node.requirers.insert(requirer);
            return false;
        }

        let depth = self.nodes.get(from).map_or(0, |n| n.depth) + 1;
        self.order.push(to.to_string());
        self.nodes.insert(to.to_string(), ClosureNode::new(depth, requirer));
        true
    }

    fn set_record(&mut self, name: &str, record: PackageRecord) {
        if let Some(node) = self.nodes.get_mut(name) {
            node.record = Some(record);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Member names in discovery order
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn node(&self, name: &str) -> Option<&ClosureNode> {
        self.nodes.get(name)
    }

    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.nodes.get(name).map(|n| n.depth)
    }

    pub fn requirers_of(&self, name: &str) -> Option<&BTreeSet<Requirer>> {
        self.nodes.get(name).map(|n| &n.requirers)
    }

    pub fn record_of(&self, name: &str) -> Option<&PackageRecord> {
        self.nodes.get(name).and_then(|n| n.record.as_ref())
    }

    /// Whether the package manager knows `name` as installed
    pub fn is_installed(&self, name: &str) -> bool {
        self.record_of(name).is_some()
    }

    /// Number of distinct seeds
    pub fn seed_count(&self) -> usize {
        self.seed_count
    }

    /// Deepest recorded depth, 0 for an empty closure
    pub fn max_depth(&self) -> usize {
        self.nodes.values().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Capability tokens no installed package provides
    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }
}

/// Expansion switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Look up the seeds only, without following any dependency
    pub flat: bool,
}

/// Computes dependency closures against one oracle and capability cache
pub struct DependencyClosure<'a> {
    oracle: &'a dyn PackageOracle,
    cache: &'a mut CapabilityCache,
    options: ExpandOptions,
}

impl<'a> DependencyClosure<'a> {
    pub fn new(oracle: &'a dyn PackageOracle, cache: &'a mut CapabilityCache) -> Self {
        Self {
            oracle,
            cache,
            options: ExpandOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }

    /// Expand `seeds` into their full closure
    ///
    /// Packages unknown to the oracle become members without a record.
    /// Only a failing capability query aborts the expansion.
    pub fn expand<I, S>(&mut self, seeds: I) -> Result<Closure>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut closure = Closure::from_seeds(seeds);
        let mut worklist: VecDeque<String> = closure.order.iter().cloned().collect();
        let oracle = self.oracle;

        while let Some(name) = worklist.pop_front() {
            let record = match oracle.lookup(&name) {
                Ok(record) => record.clone(),
                Err(Error::NotFoundError(_)) => {
                    debug!("{} is not installed", name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            closure.set_record(&name, record.clone());

            if self.options.flat {
                continue;
            }

            let resolved = self.cache.resolve(&record.dependency_tokens, oracle)?;
            for token in &record.dependency_tokens {
                let Some(candidates) = resolved.get(token) else {
                    continue;
                };
                if candidates.is_empty() {
                    closure.unresolved.insert(token.clone());
                    continue;
                }
                for candidate in candidates {
                    if closure.add_edge(&name, candidate) {
                        trace!("{} pulls in {}", name, candidate);
                        worklist.push_back(candidate.clone());
                    }
                }
            }
        }

        debug!(
            "Closure of {} seed(s): {} members, max depth {}",
            closure.seed_count(),
            closure.len(),
            closure.max_depth()
        );
        Ok(closure)
    }
}
