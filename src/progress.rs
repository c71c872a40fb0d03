// src/progress.rs

//! Progress reporting for the package database load
//!
//! The bulk listing from the package manager is the one long wait in a run.
//! `SystemRunner` reports every chunk it reads through a `ProgressTracker`;
//! the CLI picks `SpinnerProgress` with `--progress` and `SilentProgress`
//! otherwise.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Core trait for progress tracking
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount (bytes read)
    fn increment(&self, amount: u64);

    /// Get current position
    fn position(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Check if progress is finished
    fn is_finished(&self) -> bool;
}

/// Shared trackers, so the caller can close a spinner the runner feeds
impl<T: ProgressTracker + ?Sized> ProgressTracker for Arc<T> {
    fn set_message(&self, message: &str) {
        (**self).set_message(message)
    }

    fn increment(&self, amount: u64) {
        (**self).increment(amount)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn finish_with_message(&self, message: &str) {
        (**self).finish_with_message(message)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// Silent progress tracker (no-op)
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Spinner on stderr showing how much of the listing has been read
pub struct SpinnerProgress {
    bar: ProgressBar,
    finished: AtomicBool,
}

impl SpinnerProgress {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} ({bytes})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            bar,
            finished: AtomicBool::new(false),
        }
    }
}

impl ProgressTracker for SpinnerProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        self.bar.finish_and_clear();
        tracing::debug!("{}", message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}
