//! Sync session
//!
//! Owns the validated roots and runs the three-stage pipeline: a walker
//! thread, a pool of comparator threads and the copy stage on the calling
//! thread. Every spawned thread is joined before `sync` returns.

use crate::config::SyncConfig;
use crate::core::{CancelToken, ComparatorOptions, ComparatorPool, CopyStage};
use crate::error::{Result, SyncError};
use crate::fs::{CopyOptions, FileCopier, TreeWalker, WalkOptions, WalkStats};
use crate::progress::{CounterSnapshot, ProgressReporter, SyncCounters};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one successful run
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    /// Canonical source root
    pub source: PathBuf,
    /// Canonical destination root
    pub destination: PathBuf,
    /// Walker totals
    pub walk: WalkStats,
    /// Stage counters at the end of the run
    pub counters: CounterSnapshot,
    /// Nothing was copied; `files_copied` counts what would have been
    pub dry_run: bool,
    /// Wall-clock time of the run
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl SyncSummary {
    /// Files copied (or, in a dry run, files that would have been)
    pub fn files_copied(&self) -> u64 {
        self.counters.files_copied
    }

    /// Average copy throughput in bytes per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.counters.bytes_copied as f64 / secs
        } else {
            0.0
        }
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        let title = if self.dry_run { "Dry Run Summary" } else { "Sync Summary" };
        println!("\n=== {} ===", title);
        println!("Source:          {}", self.source.display());
        println!("Destination:     {}", self.destination.display());
        println!("Files found:     {}", self.walk.files_emitted);
        println!("Directories:     {}", self.walk.dirs_created);
        println!("Walk skipped:    {}", self.walk.skipped);
        println!("Identical:       {}", self.counters.files_identical);
        println!("Compare failed:  {}", self.counters.compare_failed);
        println!("Not copyable:    {}", self.counters.copy_skipped);
        if self.dry_run {
            println!("Would copy:      {}", self.counters.files_copied);
        } else {
            println!("Files copied:    {}", self.counters.files_copied);
            println!("Bytes copied:    {}", humansize::format_size(self.counters.bytes_copied, humansize::BINARY));
        }
        println!("Duration:        {:.2?}", self.duration);
        if !self.dry_run {
            println!(
                "Throughput:      {}/s",
                humansize::format_size(self.throughput() as u64, humansize::BINARY)
            );
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// One-way sync between two directory trees
pub struct SyncSession {
    source_root: PathBuf,
    destination_root: PathBuf,
    config: SyncConfig,
    counters: Arc<SyncCounters>,
    progress: Option<ProgressReporter>,
}

impl SyncSession {
    /// Validate the roots and build a session.
    ///
    /// Both roots must be existing directories. They are compared after
    /// canonicalization, so `a/../a` and a symlink to the source are both
    /// rejected as the same root.
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate().map_err(SyncError::Config)?;

        let source_root = canonical_dir(&config.source)?;
        let destination_root = canonical_dir(&config.destination)?;

        if source_root == destination_root {
            return Err(SyncError::SameSourceAndDestination(source_root));
        }
        if destination_root.starts_with(&source_root) {
            return Err(SyncError::DestinationInsideSource {
                source_root,
                destination: destination_root,
            });
        }

        Ok(Self {
            source_root,
            destination_root,
            config,
            counters: Arc::new(SyncCounters::default()),
            progress: None,
        })
    }

    /// Show a spinner while running
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Canonical source root
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Canonical destination root
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Files copied by the most recent run.
    ///
    /// Only meaningful once `sync` has returned.
    pub fn total_copied(&self) -> u64 {
        self.counters.files_copied.load(Ordering::Relaxed)
    }

    /// Run with no external cancellation
    pub fn sync(&mut self) -> Result<SyncSummary> {
        self.sync_with(&CancelToken::new())
    }

    /// Run until the tree is synced, a stage fails, or `cancel` fires.
    ///
    /// When several stages fail, a transfer error wins over a traversal
    /// error, which wins over cancellation.
    pub fn sync_with(&mut self, cancel: &CancelToken) -> Result<SyncSummary> {
        let start = Instant::now();
        self.counters = Arc::new(SyncCounters::default());

        let done = cancel.child();
        let _guard = done.drop_guard();

        tracing::info!(
            "Syncing {} -> {}",
            self.source_root.display(),
            self.destination_root.display()
        );
        if let Some(progress) = &self.progress {
            progress.set_status("scanning...");
        }

        let walker = TreeWalker::new(
            &self.source_root,
            &self.destination_root,
            WalkOptions {
                create_empty_dirs: self.config.create_empty_dirs,
                verbose: self.config.verbose,
                queue_size: self.config.queue_size,
            },
        )
        .with_counters(Arc::clone(&self.counters));
        let (entries, walk) = walker.spawn(done.clone())?;

        let options = ComparatorOptions {
            workers: self.config.workers,
            queue_size: self.config.queue_size,
            algorithm: self.config.hash,
            verbose: self.config.verbose,
        };
        let (candidates, pool) = match ComparatorPool::spawn(entries, done.clone(), options, Arc::clone(&self.counters)) {
            Ok(spawned) => spawned,
            Err(e) => {
                done.cancel();
                let _ = walk.join();
                return Err(e);
            }
        };

        let stage = CopyStage::new(FileCopier::new(CopyOptions::default()), Arc::clone(&self.counters))
            .with_verbose(self.config.verbose)
            .with_dry_run(self.config.dry_run);
        let copied = stage.drain(&candidates, &done, self.progress.as_ref());

        let interrupted = done.is_cancelled();
        // Unblock any stage still waiting on a handoff
        done.cancel();
        drop(candidates);

        let pooled = pool.join();
        let walked = walk.join();

        if let Some(progress) = &self.progress {
            match &copied {
                Ok(_) => progress.finish(&self.counters),
                Err(_) => progress.abandon(),
            }
        }

        let walk_stats = resolve_outcome(copied, walked, pooled, interrupted)?;

        let summary = SyncSummary {
            source: self.source_root.clone(),
            destination: self.destination_root.clone(),
            walk: walk_stats,
            counters: self.counters.snapshot(),
            dry_run: self.config.dry_run,
            duration: start.elapsed(),
        };
        tracing::info!(
            copied = summary.counters.files_copied,
            identical = summary.counters.files_identical,
            elapsed = ?summary.duration,
            "sync finished"
        );
        Ok(summary)
    }
}

fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| SyncError::io(path, e))?;
    if !canonical.is_dir() {
        return Err(SyncError::NotADirectory(path.to_path_buf()));
    }
    Ok(canonical)
}

/// Pick the error to report when several stages ended badly
fn resolve_outcome(
    copied: Result<u64>,
    walked: Result<WalkStats>,
    pooled: Result<()>,
    interrupted: bool,
) -> Result<WalkStats> {
    copied?;

    let stats = match walked {
        Ok(stats) => Some(stats),
        Err(e) if e.is_cancelled() => None,
        Err(e) => return Err(e),
    };
    pooled?;

    match stats {
        Some(stats) if !interrupted => Ok(stats),
        _ => Err(SyncError::Cancelled),
    }
}
