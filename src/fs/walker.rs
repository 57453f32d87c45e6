//! Source tree walker
//!
//! Depth-first traversal of the source root that feeds file entries to the
//! comparator pool over a bounded channel. Directories are never sent
//! downstream: the walker creates their mirror in the destination as it
//! discovers them, so a file's parent always exists before its entry is
//! emitted.

use crate::core::CancelToken;
use crate::error::{Result, SyncError};
use crate::fs::{classify, ensure_dir, mirror_path};
use crate::progress::SyncCounters;
use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

/// One file discovered under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute source path
    pub source: PathBuf,
    /// Mirrored absolute destination path
    pub destination: PathBuf,
    /// Source size in bytes
    pub size: u64,
    /// Always `false` for entries sent downstream
    pub is_dir: bool,
}

/// Walker settings
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Mirror empty source directories
    pub create_empty_dirs: bool,
    /// Log skip decisions
    pub verbose: bool,
    /// Capacity of the entry channel
    pub queue_size: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            create_empty_dirs: false,
            verbose: false,
            queue_size: crate::config::DEFAULT_QUEUE_SIZE,
        }
    }
}

/// Totals of a finished walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    /// File entries emitted
    pub files_emitted: u64,
    /// Destination directories created
    pub dirs_created: u64,
    /// Paths skipped (permission denied, unreadable, empty, not a regular file)
    pub skipped: u64,
}

/// Depth-first walker over a source root
pub struct TreeWalker {
    src_root: PathBuf,
    dst_root: PathBuf,
    options: WalkOptions,
    counters: Arc<SyncCounters>,
}

/// Handle to a walker running on its own thread
pub struct WalkHandle {
    handle: JoinHandle<Result<WalkStats>>,
}

impl WalkHandle {
    /// Wait for the walk to finish and return its outcome
    pub fn join(self) -> Result<WalkStats> {
        self.handle
            .join()
            .map_err(|_| SyncError::WorkerPanicked("walker".to_string()))?
    }
}

impl TreeWalker {
    /// Create a walker mirroring `src_root` onto `dst_root`
    pub fn new(src_root: impl Into<PathBuf>, dst_root: impl Into<PathBuf>, options: WalkOptions) -> Self {
        Self {
            src_root: src_root.into(),
            dst_root: dst_root.into(),
            options,
            counters: Arc::new(SyncCounters::default()),
        }
    }

    /// Share a session's counters
    pub fn with_counters(mut self, counters: Arc<SyncCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Start walking on a dedicated thread.
    ///
    /// Returns the entry stream and a handle whose `join` yields the
    /// deferred walk result. The stream closes when the walk ends for any
    /// reason. A fatal walk error cancels `cancel` so the other stages stop.
    pub fn spawn(self, cancel: CancelToken) -> Result<(Receiver<Entry>, WalkHandle)> {
        let (tx, rx) = channel::bounded(self.options.queue_size);

        let handle = thread::Builder::new()
            .name("dirsync-walker".to_string())
            .spawn(move || {
                let result = self.walk_into(&tx, &cancel);
                match &result {
                    Ok(stats) => tracing::debug!(?stats, "walk finished"),
                    Err(e) if e.is_cancelled() => tracing::debug!("walk cancelled"),
                    Err(e) => {
                        tracing::debug!(error = %e, "walk failed, cancelling pipeline");
                        cancel.cancel();
                    }
                }
                result
            })
            .map_err(|e| SyncError::io("dirsync-walker", e))?;

        Ok((rx, WalkHandle { handle }))
    }

    /// Walk the tree on the current thread, sending file entries to `tx`
    pub fn walk_into(&self, tx: &Sender<Entry>, cancel: &CancelToken) -> Result<WalkStats> {
        let verbose = self.options.verbose;
        let mut stats = WalkStats::default();

        let mut entries = WalkDir::new(&self.src_root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = entries.next() {
            cancel.check()?;

            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.src_root.clone());
                    let denied = err
                        .io_error()
                        .is_some_and(|e| e.kind() == ErrorKind::PermissionDenied);
                    if denied {
                        diag!(verbose, path = %path.display(), "permission denied, skipping");
                        self.skip(&mut stats);
                        continue;
                    }
                    return Err(SyncError::traversal(path, err.into()));
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                match classify::is_empty_dir(path) {
                    Ok(true) if !self.options.create_empty_dirs => {
                        diag!(verbose, path = %path.display(), "empty directory, skipping");
                        self.skip(&mut stats);
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) if e.is_permission_error() => {
                        diag!(verbose, path = %path.display(), "directory not readable, skipping subtree");
                        entries.skip_current_dir();
                        self.skip(&mut stats);
                        continue;
                    }
                    Err(e) => return Err(into_traversal(e, path)),
                }

                let dest = mirror_path(&self.src_root, &self.dst_root, path)?;
                match ensure_dir(&dest) {
                    Ok(true) => {
                        stats.dirs_created += 1;
                        SyncCounters::add(&self.counters.dirs_created, 1);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        diag!(verbose, path = %dest.display(), error = %e, "failed to create destination directory");
                    }
                }
                continue;
            }

            if !file_type.is_file() {
                diag!(verbose, path = %path.display(), "not a regular file, skipping");
                self.skip(&mut stats);
                continue;
            }

            match classify::is_readable(path) {
                Ok(true) => {}
                Ok(false) => {
                    diag!(verbose, path = %path.display(), "file not readable, skipping");
                    self.skip(&mut stats);
                    continue;
                }
                Err(e) => return Err(into_traversal(e, path)),
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    let io_err: std::io::Error = err.into();
                    if io_err.kind() == ErrorKind::PermissionDenied {
                        diag!(verbose, path = %path.display(), "metadata not readable, skipping");
                        self.skip(&mut stats);
                        continue;
                    }
                    return Err(SyncError::traversal(path, io_err));
                }
            };

            let item = Entry {
                source: path.to_path_buf(),
                destination: mirror_path(&self.src_root, &self.dst_root, path)?,
                size,
                is_dir: false,
            };

            crossbeam::select! {
                send(tx, item) -> sent => {
                    if sent.is_err() {
                        // Every comparator is gone; nothing left to feed.
                        return Err(SyncError::Cancelled);
                    }
                }
                recv(cancel.done()) -> _ => {
                    diag!(verbose, "walk cancelled while handing off entry");
                    return Err(SyncError::Cancelled);
                }
            }

            stats.files_emitted += 1;
            SyncCounters::add(&self.counters.files_discovered, 1);
        }

        Ok(stats)
    }

    fn skip(&self, stats: &mut WalkStats) {
        stats.skipped += 1;
        SyncCounters::add(&self.counters.walk_skipped, 1);
    }
}

fn into_traversal(err: SyncError, path: &Path) -> SyncError {
    match err {
        SyncError::Io { source, .. } => SyncError::traversal(path, source),
        other => other,
    }
}
