// src/cli.rs
//! CLI definitions for find-prereqs
//!
//! This module contains the command-line interface definition using clap.
//! The command itself is implemented in the `commands` module.

use crate::platform::OS_RELEASE_PATH;
use crate::resolver::DEFAULT_HIGHLIGHT;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "find-prereqs")]
#[command(author = "find-prereqs Contributors")]
#[command(version)]
#[command(
    about = "List the installed packages that a set of prerequisites depends on",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "simple")]
    pub verbose: u8,

    /// Decrease log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// List the packages that required each package
    #[arg(short, long, conflicts_with = "simple")]
    pub details: bool,

    /// Show a spinner while the package database loads
    #[arg(short = '.', long)]
    pub progress: bool,

    /// Highlight missing packages with an ANSI color code
    #[arg(
        short,
        long,
        value_name = "CODE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_HIGHLIGHT
    )]
    pub color: Option<String>,

    /// Read prerequisites from FILE, one per line ('-' for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub prereqs: Option<String>,

    /// Only look up the prerequisites themselves
    #[arg(short, long, conflicts_with = "levels")]
    pub flat: bool,

    /// Print the depth of each package
    #[arg(short, long)]
    pub levels: bool,

    /// Print 'name, version' rows and no counts
    #[arg(short, long)]
    pub simple: bool,

    /// Hide packages deeper than N
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the loaded package database and capability cache
    #[arg(long)]
    pub dump_db: bool,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// os-release file used to detect the distro
    #[arg(long, value_name = "FILE", default_value = OS_RELEASE_PATH)]
    pub os_release: PathBuf,
}

impl Cli {
    /// Log filter derived from `-v`/`-q` when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        match self.verbose as i16 - self.quiet as i16 {
            i16::MIN..=-1 => "error",
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
