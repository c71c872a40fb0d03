// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use find_prereqs::packages::{CommandOutput, CommandRunner};
use find_prereqs::{Error, PackageOracle, PackageRecord, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// In-memory oracle that records every capability query it receives
#[derive(Default)]
pub struct FakeOracle {
    records: HashMap<String, PackageRecord>,
    capabilities: HashMap<String, Vec<String>>,
    capability_layer: bool,
    queries: RefCell<Vec<Vec<String>>>,
}

impl FakeOracle {
    /// Oracle for a manager whose dependencies are package names
    pub fn direct() -> Self {
        Self::default()
    }

    /// Oracle for a manager whose dependencies are capabilities
    pub fn with_capabilities() -> Self {
        Self {
            capability_layer: true,
            ..Self::default()
        }
    }

    pub fn package(mut self, name: &str, version: &str, depends: &[&str]) -> Self {
        let tokens = depends.iter().map(|d| d.to_string()).collect();
        self.records
            .insert(name.to_string(), PackageRecord::new(name, version, tokens));
        self
    }

    pub fn provides(mut self, capability: &str, providers: &[&str]) -> Self {
        self.capabilities.insert(
            capability.to_string(),
            providers.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Number of capability queries issued so far
    pub fn query_count(&self) -> usize {
        self.queries.borrow().len()
    }

    /// Every token asked about, across all queries
    pub fn queried_tokens(&self) -> Vec<String> {
        self.queries.borrow().iter().flatten().cloned().collect()
    }
}

impl PackageOracle for FakeOracle {
    fn lookup(&self, name: &str) -> Result<&PackageRecord> {
        self.records
            .get(name)
            .ok_or_else(|| Error::NotFoundError(name.to_string()))
    }

    fn resolve_capabilities(&self, tokens: &[String]) -> Result<HashMap<String, Vec<String>>> {
        self.queries.borrow_mut().push(tokens.to_vec());
        Ok(tokens
            .iter()
            .map(|t| (t.clone(), self.capabilities.get(t).cloned().unwrap_or_default()))
            .collect())
    }

    fn has_capability_layer(&self) -> bool {
        self.capability_layer
    }
}

/// make and gcc installed; bash and glibc are not
pub fn make_gcc_oracle() -> FakeOracle {
    FakeOracle::direct()
        .package("make", "3.82-24.el7", &["bash"])
        .package("gcc", "4.8.5-44.el7", &["glibc", "cc1"])
        .package("cc1", "4.8.5-44.el7", &[])
}

/// Plays back canned outputs in order and records each invocation
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    outputs: Rc<RefCell<VecDeque<CommandOutput>>>,
    pub calls: Rc<RefCell<Vec<(String, Vec<String>)>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, success: bool, stdout: &str) -> Self {
        self.outputs.borrow_mut().push_back(CommandOutput {
            success,
            code: Some(if success { 0 } else { 1 }),
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
        self
    }

    fn next(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((program.to_string(), args.to_vec()));
        self.outputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::OracleError(format!("unexpected call to {}", program)))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.next(program, args)
    }

    fn run_merged(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.next(program, args)
    }
}
