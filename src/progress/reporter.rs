//! Progress accounting and display
//!
//! [`SyncCounters`] is the shared tally every stage updates with relaxed
//! atomics. [`ProgressReporter`] renders it as an indicatif spinner while a
//! session runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Running totals of a sync session.
///
/// `files_copied` and `bytes_copied` are written only by the copy stage.
/// Callers read the values after the pipeline has been joined.
#[derive(Debug, Default)]
pub struct SyncCounters {
    /// Directories created in the destination by the walker
    pub dirs_created: AtomicU64,
    /// File entries emitted by the walker
    pub files_discovered: AtomicU64,
    /// Entries skipped by the walker (unreadable, permission denied, empty dir)
    pub walk_skipped: AtomicU64,
    /// Entries fully examined by comparators
    pub files_examined: AtomicU64,
    /// Entries found identical and left alone
    pub files_identical: AtomicU64,
    /// Entries dropped by comparators after a read error
    pub compare_failed: AtomicU64,
    /// Candidates skipped by the copy stage because they carried a reason
    pub copy_skipped: AtomicU64,
    /// Files copied
    pub files_copied: AtomicU64,
    /// Bytes copied
    pub bytes_copied: AtomicU64,
}

impl SyncCounters {
    /// Add to a counter
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a plain copy of every counter
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            dirs_created: self.dirs_created.load(Ordering::Relaxed),
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            walk_skipped: self.walk_skipped.load(Ordering::Relaxed),
            files_examined: self.files_examined.load(Ordering::Relaxed),
            files_identical: self.files_identical.load(Ordering::Relaxed),
            compare_failed: self.compare_failed.load(Ordering::Relaxed),
            copy_skipped: self.copy_skipped.load(Ordering::Relaxed),
            files_copied: self.files_copied.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SyncCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Directories created
    pub dirs_created: u64,
    /// File entries emitted by the walker
    pub files_discovered: u64,
    /// Entries skipped by the walker
    pub walk_skipped: u64,
    /// Entries examined by comparators
    pub files_examined: u64,
    /// Entries found identical
    pub files_identical: u64,
    /// Entries dropped after a comparison read error
    pub compare_failed: u64,
    /// Candidates skipped by the copy stage
    pub copy_skipped: u64,
    /// Files copied
    pub files_copied: u64,
    /// Bytes copied
    pub bytes_copied: u64,
}

/// Spinner showing the copy stage's progress
pub struct ProgressReporter {
    bar: ProgressBar,
    enabled: bool,
}

impl ProgressReporter {
    /// Create a visible progress reporter on stderr
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar, enabled: true }
    }

    /// Create a reporter that draws nothing
    pub fn disabled() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_draw_target(ProgressDrawTarget::hidden());
        Self { bar, enabled: false }
    }

    /// Refresh the message from the current counters
    pub fn update(&self, counters: &SyncCounters) {
        if !self.enabled {
            return;
        }
        let snap = counters.snapshot();
        self.bar.set_message(format!(
            "{} examined, {} identical, {} copied ({})",
            snap.files_examined,
            snap.files_identical,
            snap.files_copied,
            humansize::format_size(snap.bytes_copied, humansize::BINARY),
        ));
    }

    /// Show a free-form status line
    pub fn set_status(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Stop the spinner and leave the final message
    pub fn finish(&self, counters: &SyncCounters) {
        self.update(counters);
        self.bar.finish();
    }

    /// Stop the spinner and clear it
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = SyncCounters::default();
        SyncCounters::add(&counters.files_copied, 2);
        SyncCounters::add(&counters.bytes_copied, 10);
        SyncCounters::add(&counters.files_copied, 1);

        let snap = counters.snapshot();
        assert_eq!(snap.files_copied, 3);
        assert_eq!(snap.bytes_copied, 10);
        assert_eq!(snap.files_identical, 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let counters = std::sync::Arc::new(SyncCounters::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = std::sync::Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        SyncCounters::add(&counters.files_examined, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.snapshot().files_examined, 8000);
    }

    #[test]
    fn test_disabled_reporter() {
        let reporter = ProgressReporter::disabled();
        assert!(!reporter.enabled);
        let counters = SyncCounters::default();
        reporter.update(&counters);
        reporter.finish(&counters);
    }
}
