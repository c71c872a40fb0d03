// src/packages/rpm_query.rs

//! Query installed RPM packages from the system database
//!
//! One `rpm -qa` call lists every package together with its requires and
//! provides, split by a private delimiter. Requires are capability tokens;
//! `rpm -q --whatprovides` translates the ones the provides preload does not
//! cover, many tokens per invocation.

use crate::error::{Error, Result};
use crate::packages::database::PackageRecord;
use crate::packages::exec::CommandRunner;
use crate::packages::manager::{PackageListing, PackageManagerAdapter, PackageManagerKind};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Splits the requires half of a record from the provides half
///
/// Must never appear in a real capability or package name.
pub const DEFAULT_DELIMITER: &str = "@-@";

/// Pseudo-packages holding imported signing keys
const GPG_PUBKEY_PREFIX: &str = "gpg-pubkey";

/// Requires on rpm's own features, never provided by a package
const RPMLIB_PREFIX: &str = "rpmlib(";

/// Architecture-independent packages
const NOARCH: &str = "noarch";

/// A parsed `name-[epoch:]version-release.arch` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmNevra {
    pub name: String,
    pub epoch: Option<u64>,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl RpmNevra {
    /// Parse NEVRA as printed by `%{NEVRA}` or a plain `rpm -q`
    pub fn parse(nevra: &str) -> Option<Self> {
        let nevra = nevra.trim();
        let (nevr, arch) = nevra.rsplit_once('.')?;
        let mut parts = nevr.rsplitn(3, '-');
        let release = parts.next()?;
        let ev = parts.next()?;
        let name = parts.next()?;
        if name.is_empty() || ev.is_empty() || release.is_empty() || arch.is_empty() {
            return None;
        }

        let (epoch, version) = match ev.split_once(':') {
            Some((e, v)) => (e.parse().ok(), v),
            None => (None, ev),
        };

        Some(Self {
            name: name.to_string(),
            epoch,
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
        })
    }
}

/// RPM-style package manager adapter
pub struct RpmQuery {
    runner: Box<dyn CommandRunner>,
    delimiter: String,
    machine: String,
}

impl RpmQuery {
    pub fn new(runner: Box<dyn CommandRunner>, delimiter: &str, machine: impl Into<String>) -> Self {
        Self {
            runner,
            delimiter: delimiter.to_string(),
            machine: machine.into(),
        }
    }

    /// Arguments of the bulk listing query
    pub fn bulk_args(&self) -> Vec<String> {
        vec![
            "-qa".to_string(),
            "--qf".to_string(),
            format!(
                "%{{NEVRA}}\t%{{VERSION}}\t[%{{REQUIRES}},]{},[%{{PROVIDES}},]\n",
                self.delimiter
            ),
        ]
    }

    /// Arguments of a batched whatprovides query
    ///
    /// A delimiter follows every token. Nothing provides the delimiter, so
    /// rpm answers each one with a "no package provides" line that closes
    /// the preceding token's provider list.
    pub fn what_provides_args(&self, capabilities: &[String]) -> Vec<String> {
        let mut args = vec!["-q".to_string(), "--whatprovides".to_string()];
        for capability in capabilities {
            args.push(capability.clone());
            args.push(self.delimiter.clone());
        }
        args
    }

    /// Whether a package built for `arch` can be installed on this machine
    pub fn is_good_arch(&self, arch: &str) -> bool {
        arch == self.machine || arch == NOARCH
    }

    /// Parse the complete output of the bulk query
    pub fn parse_listing(&self, output: &str) -> Result<PackageListing> {
        let mut listing = PackageListing::default();
        let mut dropped = 0usize;

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.splitn(3, '\t').collect();
            if fields.len() < 3 {
                warn!("Skipping malformed rpm output line: {}", line);
                continue;
            }
            let (nevra, version, depends) = (fields[0], fields[1], fields[2]);

            let Some(parsed) = RpmNevra::parse(nevra) else {
                debug!("Skipping unparsable NEVRA: {}", nevra);
                dropped += 1;
                continue;
            };
            if parsed.name.starts_with(GPG_PUBKEY_PREFIX) {
                continue;
            }
            if !self.is_good_arch(&parsed.arch) {
                dropped += 1;
                continue;
            }

            let tokens = split_dependency_field(depends);
            let Some(delim_ndx) = tokens.iter().position(|t| *t == self.delimiter) else {
                return Err(Error::ParseError(format!(
                    "no '{}' delimiter in dependency field of {}",
                    self.delimiter, nevra
                )));
            };

            let requires: Vec<String> = tokens[..delim_ndx]
                .iter()
                .filter(|t| !t.starts_with(RPMLIB_PREFIX))
                .map(|t| t.to_string())
                .collect();
            for provide in &tokens[delim_ndx + 1..] {
                if *provide != self.delimiter {
                    listing.provides.push((provide.to_string(), parsed.name.clone()));
                }
            }

            listing.records.push(PackageRecord::new(
                parsed.name,
                version.to_string(),
                requires,
            ));
        }

        debug!(
            "Parsed {} rpm records ({} dropped by arch filter), {} provides",
            listing.records.len(),
            dropped,
            listing.provides.len()
        );
        Ok(listing)
    }

    /// Split merged whatprovides output into one provider list per token
    pub fn parse_what_provides(
        &self,
        capabilities: &[String],
        output: &str,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut pack_lists: Vec<Vec<String>> = Vec::with_capacity(capabilities.len());
        let mut current: Vec<String> = Vec::new();

        for line in output.lines() {
            if line.contains(self.delimiter.as_str()) {
                pack_lists.push(std::mem::take(&mut current));
                continue;
            }
            if line.starts_with("no package provides") {
                continue;
            }
            if let Some(nevra) = RpmNevra::parse(line)
                && self.is_good_arch(&nevra.arch)
                && !current.contains(&nevra.name)
            {
                current.push(nevra.name);
            }
        }

        if pack_lists.len() != capabilities.len() {
            return Err(Error::OracleError(format!(
                "rpm --whatprovides answered {} of {} capabilities",
                pack_lists.len(),
                capabilities.len()
            )));
        }

        Ok(capabilities.iter().cloned().zip(pack_lists).collect())
    }
}

impl PackageManagerAdapter for RpmQuery {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Rpm
    }

    fn list_all(&self) -> Result<PackageListing> {
        debug!("Querying all installed RPM packages with requires and provides");

        let output = self.runner.run("rpm", &self.bulk_args())?;
        if !output.success {
            return Err(Error::OracleError(format!(
                "rpm -qa failed ({}): {}",
                output.status_text(),
                output.stderr.trim()
            )));
        }

        self.parse_listing(&output.stdout)
    }

    fn what_provides(&self, capabilities: &[String]) -> Result<HashMap<String, Vec<String>>> {
        if capabilities.is_empty() {
            return Ok(HashMap::new());
        }
        debug!("Resolving {} capabilities with rpm --whatprovides", capabilities.len());

        // Exits non-zero whenever any argument (every delimiter included)
        // has no provider, so the status carries no information here.
        let output = self
            .runner
            .run_merged("rpm", &self.what_provides_args(capabilities))?;

        self.parse_what_provides(capabilities, &output.stdout)
    }
}

/// Split a comma-separated dependency field into bare tokens
///
/// Version constraints (`foo >= 1.2`) are cut at the first whitespace.
pub(crate) fn split_dependency_field(field: &str) -> Vec<&str> {
    field
        .trim_end_matches([',', ' ', '\n'])
        .split(',')
        .filter_map(|dep| dep.split_whitespace().next())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::exec::CommandOutput;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Replays one canned output and records the arguments it was given
    struct CannedRunner {
        output: CommandOutput,
        calls: Rc<RefCell<Vec<Vec<String>>>>,
    }

    impl CommandRunner for CannedRunner {
        fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(self.output.clone())
        }

        fn run_merged(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            self.run(program, args)
        }
    }

    fn rpm_with(stdout: &str, success: bool) -> (RpmQuery, Rc<RefCell<Vec<Vec<String>>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = CannedRunner {
            output: CommandOutput {
                success,
                code: Some(if success { 0 } else { 1 }),
                stdout: stdout.to_string(),
                stderr: "error: rpmdb open failed".to_string(),
            },
            calls: Rc::clone(&calls),
        };
        (RpmQuery::new(Box::new(runner), DEFAULT_DELIMITER, "x86_64"), calls)
    }

    #[test]
    fn test_parse_nevra() {
        let n = RpmNevra::parse("gcc-c++-4.8.5-44.el7.x86_64").unwrap();
        assert_eq!(n.name, "gcc-c++");
        assert_eq!(n.epoch, None);
        assert_eq!(n.version, "4.8.5");
        assert_eq!(n.release, "44.el7");
        assert_eq!(n.arch, "x86_64");

        let n = RpmNevra::parse("make-1:3.82-24.el7.x86_64").unwrap();
        assert_eq!(n.name, "make");
        assert_eq!(n.epoch, Some(1));
        assert_eq!(n.version, "3.82");

        assert!(RpmNevra::parse("no package provides libfoo.so.1").is_none());
        assert!(RpmNevra::parse("justaname").is_none());
    }

    #[test]
    fn test_split_dependency_field_strips_constraints() {
        let tokens = split_dependency_field("bash >= 4.0, libc.so.6()(64bit),  /bin/sh,@-@,make = 1:3.82,");
        assert_eq!(
            tokens,
            vec!["bash", "libc.so.6()(64bit)", "/bin/sh", "@-@", "make"]
        );
        assert!(split_dependency_field("").is_empty());
    }

    #[test]
    fn test_parse_listing_splits_requires_and_provides() {
        let output = "\
make-1:3.82-24.el7.x86_64\t3.82\tbash,libc.so.6()(64bit),rpmlib(CompressedFileNames) <= 3.0.4-1,@-@,make = 1:3.82-24.el7,make(x86-64) = 1:3.82-24.el7,
gpg-pubkey-f4a80eb5-53a7ff4b.(none)\tf4a80eb5\t@-@,gpg(CentOS-7 Key),
glibc-2.17-317.el7.i686\t2.17\t@-@,libc.so.6,
tzdata-2020a-1.el7.noarch\t2020a\t@-@,tzdata = 2020a-1.el7,
";
        let (rpm, _) = rpm_with("", true);
        let listing = rpm.parse_listing(output).unwrap();

        assert_eq!(listing.records.len(), 2);
        let make = &listing.records[0];
        assert_eq!(make.name, "make");
        assert_eq!(make.version, "3.82");
        assert_eq!(make.dependency_tokens, vec!["bash", "libc.so.6()(64bit)"]);
        assert_eq!(listing.records[1].name, "tzdata");
        assert!(listing.records[1].dependency_tokens.is_empty());

        assert!(listing.provides.contains(&("make".to_string(), "make".to_string())));
        assert!(listing.provides.contains(&("make(x86-64)".to_string(), "make".to_string())));
        assert!(listing.provides.contains(&("tzdata".to_string(), "tzdata".to_string())));
        // The i686 glibc is not installable here, so it provides nothing
        assert!(!listing.provides.iter().any(|(_, p)| p == "glibc"));
    }

    #[test]
    fn test_parse_listing_requires_delimiter() {
        let (rpm, _) = rpm_with("", true);
        let err = rpm
            .parse_listing("make-3.82-24.el7.x86_64\t3.82\tbash,\n")
            .unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_list_all_failure_is_fatal() {
        let (rpm, calls) = rpm_with("", false);
        let err = rpm.list_all().unwrap_err();
        assert!(matches!(err, Error::OracleError(_)));
        assert!(err.to_string().contains("(exit status 1): error: rpmdb open failed"));
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(calls.borrow()[0][0], "-qa");
    }

    #[test]
    fn test_what_provides_args_interleave_delimiter() {
        let (rpm, _) = rpm_with("", true);
        let args = rpm.what_provides_args(&["a".to_string(), "b".to_string()]);
        assert_eq!(args, vec!["-q", "--whatprovides", "a", "@-@", "b", "@-@"]);
    }

    #[test]
    fn test_what_provides_splits_per_token() {
        let output = "\
libfoo-1.0-1.el7.x86_64
libfoo-compat-1.0-1.el7.x86_64
libfoo-1.0-1.el7.i686
no package provides @-@
no package provides libmissing.so.2
no package provides @-@
bash-4.2.46-34.el7.x86_64
no package provides @-@
";
        let (rpm, calls) = rpm_with(output, false);
        let caps = vec![
            "libfoo.so.1".to_string(),
            "libmissing.so.2".to_string(),
            "/bin/sh".to_string(),
        ];
        let resolved = rpm.what_provides(&caps).unwrap();

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(resolved["libfoo.so.1"], vec!["libfoo", "libfoo-compat"]);
        assert!(resolved["libmissing.so.2"].is_empty());
        assert_eq!(resolved["/bin/sh"], vec!["bash"]);
    }

    #[test]
    fn test_what_provides_lost_framing() {
        let (rpm, _) = rpm_with("bash-4.2.46-34.el7.x86_64\n", false);
        let err = rpm.what_provides(&["/bin/sh".to_string()]).unwrap_err();
        assert!(matches!(err, Error::OracleError(_)));
    }

    #[test]
    fn test_what_provides_empty_request_skips_rpm() {
        let (rpm, calls) = rpm_with("", true);
        assert!(rpm.what_provides(&[]).unwrap().is_empty());
        assert!(calls.borrow().is_empty());
    }
}
