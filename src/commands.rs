// src/commands.rs
//! Command handler for the find-prereqs CLI

use crate::cli::Cli;
use crate::config::Config;
use crate::packages::{adapter_for, CommandRunner, SystemOracle, SystemRunner};
use crate::platform::{OsRelease, read_seed_source};
use crate::progress::{ProgressTracker, SpinnerProgress};
use crate::resolver::{DependencyClosure, ExpandOptions, RenderOptions, ResultView};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run one complete expansion against the host and print the report to stdout
pub fn run(cli: &Cli) -> Result<()> {
    let spinner = cli
        .progress
        .then(|| Arc::new(SpinnerProgress::new("Loading package database")));
    let runner = match &spinner {
        Some(spinner) => SystemRunner::with_progress(Box::new(Arc::clone(spinner))),
        None => SystemRunner::new(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let progress = spinner.as_deref().map(|s| s as &dyn ProgressTracker);
    let result = run_with(cli, Box::new(runner), progress, &mut out);

    if let Some(spinner) = &spinner
        && !spinner.is_finished()
    {
        spinner.finish_with_message("Stopped");
    }
    result
}

/// Run one complete expansion through `runner`, writing the report to `out`
///
/// `progress` is finished once the package database has been loaded.
pub fn run_with(
    cli: &Cli,
    runner: Box<dyn CommandRunner>,
    progress: Option<&dyn ProgressTracker>,
    out: &mut dyn Write,
) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let os = OsRelease::detect(&cli.os_release).context("Failed to identify the distribution")?;
    if os.is_guess() {
        info!("No usable {}, assuming {}", cli.os_release.display(), os.pretty_name());
    }

    // Decided before any seeds are read: a seed file is useless without a manager
    let kind = config.package_manager_for(&os)?;
    debug!("Using {} package manager", kind);

    let seeds = match &cli.prereqs {
        Some(source) => {
            let seeds = read_seed_source(source)
                .with_context(|| format!("Failed to read prerequisites from {}", source))?;
            info!("Using prerequisites read from {}", source);
            seeds
        }
        None => config.prereqs_for(&os)?,
    };

    let adapter = adapter_for(kind, runner, &config.delimiter);
    let loaded = SystemOracle::load_all(adapter);
    if let Some(progress) = progress {
        progress.finish_with_message("Package database loaded");
    }
    let oracle = loaded.with_context(|| format!("Failed to load the {} database", kind))?;

    let mut cache = oracle.capability_cache();

    if cli.dump_db {
        for record in oracle.database().sorted_records() {
            writeln!(
                out,
                "{} {} [{}]",
                record.name,
                record.version,
                record.dependency_tokens.join(", ")
            )?;
        }
        for (capability, providers) in cache.sorted_entries() {
            writeln!(out, "{} -> {}", capability, providers.join(", "))?;
        }
    }

    let closure = DependencyClosure::new(&oracle, &mut cache)
        .with_options(ExpandOptions { flat: cli.flat })
        .expand(&seeds)
        .context("Failed to expand prerequisites")?;
    if closure.is_empty() {
        warn!("No prerequisites to expand");
    }

    let stats = cache.stats();
    debug!(
        "Capability cache: {} hits, {} misses, {} queries ({:.1}% hit rate)",
        stats.hits,
        stats.misses,
        stats.queries,
        stats.hit_rate() * 100.0
    );

    let view = ResultView::new(&closure).with_max_depth(cli.max_depth);
    if cli.json {
        let json = serde_json::to_string_pretty(&view.report())?;
        writeln!(out, "{}", json)?;
    } else {
        let options = RenderOptions {
            details: cli.details,
            levels: cli.levels,
            simple: cli.simple,
            flat: cli.flat,
            highlight: cli.color.clone(),
        };
        view.render(&options, out)?;
    }
    out.flush()?;

    Ok(())
}
