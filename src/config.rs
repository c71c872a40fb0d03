// src/config.rs

//! Tool configuration
//!
//! Everything has a compiled-in default. An optional TOML file may change
//! the RPM delimiter and add or replace distro entries:
//!
//! ```toml
//! delimiter = "@-@"
//!
//! [distros.rocky]
//! package_manager = "rpm"
//!
//! [[distros.rocky.releases]]
//! version = '9(\..*)?'
//! prereqs = ["make", "gcc"]
//! ```

use crate::error::{Error, Result};
use crate::packages::rpm_query::DEFAULT_DELIMITER;
use crate::packages::PackageManagerKind;
use crate::platform::{builtin_distros, DistroEntry, OsRelease};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Private delimiter for RPM queries
    pub delimiter: String,
    /// Distro ID -> package manager and seed lists
    pub distros: BTreeMap<String, DistroEntry>,
}

/// On-disk shape; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    delimiter: Option<String>,
    #[serde(default)]
    distros: BTreeMap<String, DistroEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            distros: builtin_distros(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` if given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults, overlaid with the TOML document `text`
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::default();
        if let Some(delimiter) = file.delimiter {
            config.delimiter = delimiter;
        }
        config.distros.extend(file.distros);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Dependency tokens are cut at the first comma or whitespace
        if self.delimiter.is_empty()
            || self.delimiter.contains(',')
            || self.delimiter.chars().any(char::is_whitespace)
        {
            return Err(Error::ConfigError(format!(
                "Unusable delimiter {:?}: must be non-empty and free of commas and whitespace",
                self.delimiter
            )));
        }
        for entry in self.distros.values() {
            entry.validate()?;
        }
        Ok(())
    }

    fn distro<'a>(&'a self, os: &'a OsRelease) -> Result<(&'a str, &'a DistroEntry)> {
        let id = os
            .id()
            .ok_or_else(|| Error::ConfigError("os-release has no ID".to_string()))?;
        let entry = self.distros.get(id).ok_or_else(|| {
            Error::ConfigError(format!("Can't choose a package manager to use on '{}'", id))
        })?;
        Ok((id, entry))
    }

    /// Package manager for the detected distro
    pub fn package_manager_for(&self, os: &OsRelease) -> Result<PackageManagerKind> {
        Ok(self.distro(os)?.1.package_manager)
    }

    /// Built-in prerequisites for the detected distro and version
    pub fn prereqs_for(&self, os: &OsRelease) -> Result<Vec<String>> {
        let (id, entry) = self.distro(os)?;
        let version = os.version_id().unwrap_or("");
        match entry.prereqs_for(version)? {
            Some(prereqs) => {
                info!("Using prerequisites from {}", os.pretty_name());
                Ok(prereqs.to_vec())
            }
            None => Err(Error::ConfigError(format!(
                "I couldn't figure out what prerequisites to use for {} {}",
                id, version
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(text: &str) -> OsRelease {
        OsRelease::parse(text)
    }

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.delimiter, "@-@");
        let ubuntu = os("ID=ubuntu\nVERSION_ID=\"14.04\"\n");
        assert_eq!(config.package_manager_for(&ubuntu).unwrap(), PackageManagerKind::Dpkg);
        assert!(config
            .prereqs_for(&ubuntu)
            .unwrap()
            .contains(&"linux-headers-generic".to_string()));
    }

    #[test]
    fn test_toml_overlay() {
        let config = Config::from_toml_str(
            r#"
delimiter = "<=>"

[distros.rocky]
package_manager = "rpm"

[[distros.rocky.releases]]
version = '9(\..*)?'
prereqs = ["make", "gcc"]
"#,
        )
        .unwrap();
        assert_eq!(config.delimiter, "<=>");
        assert!(config.distros.contains_key("centos"));

        let rocky = os("ID=rocky\nVERSION_ID=9.3\n");
        assert_eq!(config.package_manager_for(&rocky).unwrap(), PackageManagerKind::Rpm);
        assert_eq!(config.prereqs_for(&rocky).unwrap(), vec!["make", "gcc"]);

        let rocky8 = os("ID=rocky\nVERSION_ID=8.9\n");
        assert!(matches!(config.prereqs_for(&rocky8), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("find-prereqs.toml");
        std::fs::write(
            &path,
            "[distros.ubuntu]\npackage_manager = \"dpkg\"\n[[distros.ubuntu.releases]]\nversion = '.*'\nprereqs = [\"build-essential\"]\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let ubuntu = os("ID=ubuntu\nVERSION_ID=\"14.04\"\n");
        assert_eq!(config.prereqs_for(&ubuntu).unwrap(), vec!["build-essential"]);
    }

    #[test]
    fn test_prereqs_for_centos() {
        let config = Config::default();
        let prereqs = {
            let centos = os("ID=centos\nVERSION_ID=\"7\"\n");
            config.prereqs_for(&centos).unwrap()
        };
        assert!(prereqs.contains(&"ncurses-devel".to_string()));
    }

    #[test]
    fn test_unknown_distro_is_config_error() {
        let config = Config::default();
        let arch = os("ID=arch\n");
        assert!(matches!(config.package_manager_for(&arch), Err(Error::ConfigError(_))));
        assert!(matches!(config.prereqs_for(&os("NAME=x\n")), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_bad_files_rejected() {
        assert!(matches!(Config::from_toml_str("delimiter = ,"), Err(Error::Toml(_))));
        assert!(matches!(Config::from_toml_str("colour = 1"), Err(Error::Toml(_))));
        for delimiter in ["a,b", "@ @", "@\\t@", " ", ""] {
            let text = format!("delimiter = \"{}\"", delimiter);
            assert!(
                matches!(Config::from_toml_str(&text), Err(Error::ConfigError(_))),
                "{:?}",
                delimiter
            );
        }
        assert!(matches!(
            Config::from_toml_str(
                "[distros.x]\npackage_manager = \"rpm\"\n[[distros.x.releases]]\nversion = \"(\"\nprereqs = []\n"
            ),
            Err(Error::Regex(_))
        ));
        assert!(matches!(
            Config::load(Some(Path::new("/nonexistent/find-prereqs.toml"))),
            Err(Error::ConfigError(_))
        ));
    }
}
