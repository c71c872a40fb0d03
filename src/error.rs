// src/error.rs

//! Error types for the prerequisite finder

use thiserror::Error;

/// Errors raised while loading the package database or expanding a closure
#[derive(Error, Debug)]
pub enum Error {
    /// The package manager could not be run, or its output lost its framing
    #[error("Package manager query failed: {0}")]
    OracleError(String),

    /// A package name has no record in the loaded database
    #[error("Package not found: {0}")]
    NotFoundError(String),

    /// Unsupported distro, missing seed table, or a bad config file
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A bulk listing record could not be split into its fields
    #[error("Malformed package manager output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid version filter: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
