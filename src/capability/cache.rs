// src/capability/cache.rs

//! Capability to package translation cache
//!
//! Asking the package manager which package provides a capability is the
//! expensive query of a run. The cache is preloaded from every installed
//! package's declared provides, and every token that still misses is
//! batched with the others from the same call into a single query. A token
//! is never asked about twice, including tokens nothing provides.

use crate::error::Result;
use crate::packages::PackageOracle;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Resolution result: token -> providing packages (possibly none)
pub type CapabilityMap = HashMap<String, Vec<String>>;

/// Counters for how well the cache did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Distinct tokens answered from the cache
    pub hits: u64,
    /// Distinct tokens that had to be asked about
    pub misses: u64,
    /// Batched queries sent to the package manager
    pub queries: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache, 1.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoized capability resolutions
#[derive(Debug, Clone, Default)]
pub struct CapabilityCache {
    entries: HashMap<String, Vec<String>>,
    pass_through: bool,
    stats: CacheStats,
}

impl CapabilityCache {
    /// An empty cache for a manager with a capability layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity translation for managers whose dependencies are package names
    pub fn pass_through() -> Self {
        Self {
            pass_through: true,
            ..Self::default()
        }
    }

    /// A cache seeded from declared provides (capability -> packages)
    pub fn preloaded(provides: &BTreeMap<String, BTreeSet<String>>) -> Self {
        let entries = provides
            .iter()
            .map(|(capability, packages)| (capability.clone(), packages.iter().cloned().collect()))
            .collect();
        Self {
            entries,
            pass_through: false,
            stats: CacheStats::default(),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    /// Cached providers of `token`, if it has been resolved before
    pub fn get(&self, token: &str) -> Option<&[String]> {
        self.entries.get(token).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// All entries sorted by capability
    pub fn sorted_entries(&self) -> Vec<(&str, &[String])> {
        let mut entries: Vec<(&str, &[String])> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Translate `tokens` into providing packages
    ///
    /// Cached tokens are answered directly; all others go to the oracle in
    /// one batched call and are cached afterwards, empty answers included.
    pub fn resolve(&mut self, tokens: &[String], oracle: &dyn PackageOracle) -> Result<CapabilityMap> {
        if self.pass_through {
            return Ok(tokens
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| (t.clone(), vec![t.clone()]))
                .collect());
        }

        let mut result = CapabilityMap::new();
        let mut todo: Vec<String> = Vec::new();
        let mut queued: HashSet<&str> = HashSet::new();

        for token in tokens {
            if token.is_empty() || result.contains_key(token) || queued.contains(token.as_str()) {
                continue;
            }
            match self.entries.get(token) {
                Some(packages) => {
                    self.stats.hits += 1;
                    result.insert(token.clone(), packages.clone());
                }
                None => {
                    self.stats.misses += 1;
                    queued.insert(token.as_str());
                    todo.push(token.clone());
                }
            }
        }

        if !todo.is_empty() {
            self.stats.queries += 1;
            debug!("Capability cache miss for {} token(s), querying", todo.len());
            let mut answered = oracle.resolve_capabilities(&todo)?;

            for token in todo {
                let mut packages = answered.remove(&token).unwrap_or_default();
                let mut seen = HashSet::new();
                packages.retain(|p| seen.insert(p.clone()));
                if packages.is_empty() {
                    debug!("No installed package provides {}", token);
                }
                self.entries.insert(token.clone(), packages.clone());
                result.insert(token, packages);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::packages::PackageRecord;
    use std::cell::RefCell;

    /// Answers from a fixed table and logs every batch it is sent
    struct TableOracle {
        table: HashMap<String, Vec<String>>,
        batches: RefCell<Vec<Vec<String>>>,
    }

    impl TableOracle {
        fn new(entries: &[(&str, &[&str])]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                    .collect(),
                batches: RefCell::new(Vec::new()),
            }
        }
    }

    impl PackageOracle for TableOracle {
        fn lookup(&self, name: &str) -> Result<&PackageRecord> {
            Err(Error::NotFoundError(name.to_string()))
        }

        fn resolve_capabilities(&self, tokens: &[String]) -> Result<CapabilityMap> {
            self.batches.borrow_mut().push(tokens.to_vec());
            Ok(tokens
                .iter()
                .filter_map(|t| self.table.get(t).map(|v| (t.clone(), v.clone())))
                .collect())
        }

        fn has_capability_layer(&self) -> bool {
            true
        }
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pass_through_is_identity() {
        let oracle = TableOracle::new(&[]);
        let mut cache = CapabilityCache::pass_through();
        let resolved = cache.resolve(&tokens(&["make", "", "bash"]), &oracle).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["make"], vec!["make"]);
        assert!(oracle.batches.borrow().is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_preloaded_hits_skip_oracle() {
        let mut provides = BTreeMap::new();
        provides.insert(
            "libc.so.6".to_string(),
            ["glibc".to_string()].into_iter().collect::<BTreeSet<_>>(),
        );
        let oracle = TableOracle::new(&[]);
        let mut cache = CapabilityCache::preloaded(&provides);

        let resolved = cache.resolve(&tokens(&["libc.so.6"]), &oracle).unwrap();
        assert_eq!(resolved["libc.so.6"], vec!["glibc"]);
        assert!(oracle.batches.borrow().is_empty());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().hit_rate(), 1.0);
    }

    #[test]
    fn test_misses_are_batched_once() {
        let oracle = TableOracle::new(&[("/bin/sh", &["bash"]), ("libz.so.1", &["zlib", "zlib"])]);
        let mut cache = CapabilityCache::new();

        let resolved = cache
            .resolve(&tokens(&["/bin/sh", "libz.so.1", "/bin/sh", "libnothing.so"]), &oracle)
            .unwrap();
        assert_eq!(oracle.batches.borrow().len(), 1);
        assert_eq!(
            oracle.batches.borrow()[0],
            tokens(&["/bin/sh", "libz.so.1", "libnothing.so"])
        );
        assert_eq!(resolved["libz.so.1"], vec!["zlib"]);
        assert!(resolved["libnothing.so"].is_empty());

        // Everything is cached now, the unresolvable token included
        cache
            .resolve(&tokens(&["libnothing.so", "/bin/sh"]), &oracle)
            .unwrap();
        assert_eq!(oracle.batches.borrow().len(), 1);
        assert_eq!(cache.get("libnothing.so"), Some(&[][..]));

        let stats = cache.stats();
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.queries, 1);
    }

    #[test]
    fn test_oracle_failure_propagates() {
        struct FailingOracle;
        impl PackageOracle for FailingOracle {
            fn lookup(&self, name: &str) -> Result<&PackageRecord> {
                Err(Error::NotFoundError(name.to_string()))
            }
            fn resolve_capabilities(&self, _tokens: &[String]) -> Result<CapabilityMap> {
                Err(Error::OracleError("rpm went away".to_string()))
            }
            fn has_capability_layer(&self) -> bool {
                true
            }
        }

        let mut cache = CapabilityCache::new();
        let err = cache.resolve(&tokens(&["x"]), &FailingOracle).unwrap_err();
        assert!(matches!(err, Error::OracleError(_)));
        assert!(cache.get("x").is_none());
    }
}
