//! Comparator worker pool
//!
//! A fixed number of threads compete for walker entries on one shared
//! channel and forward only the entries whose destination is missing or
//! differs. Checks run cheapest first: existence, then size, then a content
//! digest of both files.

use crate::config::HashAlgorithm;
use crate::core::CancelToken;
use crate::error::{Result, SyncError};
use crate::fs::{classify, Entry};
use crate::hash::contents_match;
use crate::progress::SyncCounters;
use crossbeam::channel::{self, Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// An entry that the copy stage should transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCandidate {
    /// Source file
    pub source: PathBuf,
    /// Destination file
    pub destination: PathBuf,
    /// Reason to log and skip this item instead of copying it. The
    /// comparator never sets one: a destination it cannot inspect is still
    /// handed over so the copy surfaces the real failure.
    pub error: Option<String>,
}

impl CopyCandidate {
    fn transfer(entry: Entry) -> Self {
        Self {
            source: entry.source,
            destination: entry.destination,
            error: None,
        }
    }
}

/// Outcome of comparing one entry against its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Nothing exists at the destination path
    Missing,
    /// Something other than a regular file occupies the destination path
    NotAFile,
    /// Destination metadata could not be read; the copy reports the cause
    Unknown,
    /// Destination exists with a different length
    SizeDiffers,
    /// Same length, different digest
    ContentDiffers,
    /// Same length and digest (or both empty)
    Identical,
}

impl Comparison {
    /// Whether the source must be copied
    pub fn needs_copy(&self) -> bool {
        !matches!(self, Self::Identical)
    }
}

/// Decide whether `entry` needs to be copied.
///
/// Anything that keeps the destination from being inspected is a reason to
/// copy; the copy stage then fails with the real transfer error. An `Err`
/// means a file could not be read for hashing and the caller drops the
/// entry.
pub fn compare_entry(entry: &Entry, algorithm: HashAlgorithm) -> Result<Comparison> {
    let dest = entry.destination.as_path();

    if !classify::file_exists(dest) {
        return Ok(Comparison::Missing);
    }
    if dest.is_dir() {
        return Ok(Comparison::NotAFile);
    }

    let Ok(dest_size) = classify::file_size(dest) else {
        return Ok(Comparison::Unknown);
    };

    if dest_size != entry.size {
        Ok(Comparison::SizeDiffers)
    } else if dest_size == 0 {
        Ok(Comparison::Identical)
    } else if contents_match(&entry.source, dest, algorithm)? {
        Ok(Comparison::Identical)
    } else {
        Ok(Comparison::ContentDiffers)
    }
}

/// Comparator settings
#[derive(Debug, Clone)]
pub struct ComparatorOptions {
    /// Number of worker threads
    pub workers: usize,
    /// Capacity of the candidate channel
    pub queue_size: usize,
    /// Digest for equal-size files
    pub algorithm: HashAlgorithm,
    /// Log skip decisions
    pub verbose: bool,
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self {
            workers: crate::config::DEFAULT_WORKERS,
            queue_size: crate::config::DEFAULT_QUEUE_SIZE,
            algorithm: HashAlgorithm::default(),
            verbose: false,
        }
    }
}

/// Running comparator workers
pub struct ComparatorPool {
    handles: Vec<(usize, JoinHandle<()>)>,
}

impl ComparatorPool {
    /// Start `options.workers` comparators reading from `entries`.
    ///
    /// The returned candidate stream closes once every worker has exited,
    /// which happens when `entries` is drained and closed or `cancel` fires.
    pub fn spawn(
        entries: Receiver<Entry>,
        cancel: CancelToken,
        options: ComparatorOptions,
        counters: Arc<SyncCounters>,
    ) -> Result<(Receiver<CopyCandidate>, ComparatorPool)> {
        if options.workers == 0 {
            return Err(SyncError::config("comparator pool needs at least one worker"));
        }

        let (tx, rx) = channel::bounded(options.queue_size);
        let mut pool = ComparatorPool {
            handles: Vec::with_capacity(options.workers),
        };

        for worker_id in 0..options.workers {
            let worker = Worker {
                id: worker_id,
                entries: entries.clone(),
                candidates: tx.clone(),
                cancel: cancel.clone(),
                algorithm: options.algorithm,
                verbose: options.verbose,
                counters: Arc::clone(&counters),
            };

            let spawned = thread::Builder::new()
                .name(format!("dirsync-compare-{worker_id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => pool.handles.push((worker_id, handle)),
                Err(e) => {
                    cancel.cancel();
                    // Workers already running see the cancel and exit
                    let _ = pool.join();
                    return Err(SyncError::io(format!("dirsync-compare-{worker_id}"), e));
                }
            }
        }

        Ok((rx, pool))
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no workers
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit
    pub fn join(self) -> Result<()> {
        let mut panicked = None;
        for (id, handle) in self.handles {
            if handle.join().is_err() {
                panicked.get_or_insert(id);
            }
        }
        match panicked {
            Some(id) => Err(SyncError::WorkerPanicked(format!("comparator-{id}"))),
            None => Ok(()),
        }
    }
}

struct Worker {
    id: usize,
    entries: Receiver<Entry>,
    candidates: Sender<CopyCandidate>,
    cancel: CancelToken,
    algorithm: HashAlgorithm,
    verbose: bool,
    counters: Arc<SyncCounters>,
}

impl Worker {
    fn run(self) {
        let verbose = self.verbose;

        loop {
            let entry = crossbeam::select! {
                recv(self.entries) -> msg => match msg {
                    Ok(entry) => entry,
                    Err(_) => break,
                },
                recv(self.cancel.done()) -> _ => break,
            };
            if self.cancel.is_cancelled() {
                break;
            }

            let candidate = match compare_entry(&entry, self.algorithm) {
                Ok(Comparison::Identical) => {
                    SyncCounters::add(&self.counters.files_examined, 1);
                    SyncCounters::add(&self.counters.files_identical, 1);
                    diag!(verbose, path = %entry.source.display(), "identical, skipping");
                    continue;
                }
                Ok(comparison) => {
                    SyncCounters::add(&self.counters.files_examined, 1);
                    tracing::trace!(path = %entry.source.display(), ?comparison, "needs copy");
                    CopyCandidate::transfer(entry)
                }
                Err(e) => {
                    SyncCounters::add(&self.counters.compare_failed, 1);
                    diag!(verbose, path = %entry.source.display(), error = %e, "comparison failed, skipping");
                    continue;
                }
            };

            crossbeam::select! {
                send(self.candidates, candidate) -> sent => {
                    if sent.is_err() {
                        break;
                    }
                }
                recv(self.cancel.done()) -> _ => break,
            }
        }

        tracing::debug!("Comparator {} shutting down", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn entry_for(src: &Path, dst: &Path) -> Entry {
        Entry {
            source: src.to_path_buf(),
            destination: dst.to_path_buf(),
            size: std::fs::metadata(src).unwrap().len(),
            is_dir: false,
        }
    }

    fn pair(dir: &TempDir, src: &[u8], dst: Option<&[u8]>) -> Entry {
        let s = dir.path().join("src.bin");
        let d = dir.path().join("dst.bin");
        std::fs::write(&s, src).unwrap();
        if let Some(content) = dst {
            std::fs::write(&d, content).unwrap();
        }
        entry_for(&s, &d)
    }

    #[test]
    fn test_missing_destination() {
        let dir = TempDir::new().unwrap();
        let entry = pair(&dir, b"hello", None);
        assert_eq!(compare_entry(&entry, HashAlgorithm::XXHash3).unwrap(), Comparison::Missing);
    }

    #[test]
    fn test_size_differs() {
        let dir = TempDir::new().unwrap();
        let entry = pair(&dir, b"hello", Some(b"hello world"));
        assert_eq!(compare_entry(&entry, HashAlgorithm::XXHash3).unwrap(), Comparison::SizeDiffers);
    }

    #[test]
    fn test_same_size_different_content() {
        let dir = TempDir::new().unwrap();
        let entry = pair(&dir, b"hello", Some(b"hella"));
        assert_eq!(compare_entry(&entry, HashAlgorithm::XXHash3).unwrap(), Comparison::ContentDiffers);
        assert_eq!(compare_entry(&entry, HashAlgorithm::Sha256).unwrap(), Comparison::ContentDiffers);
    }

    #[test]
    fn test_identical() {
        let dir = TempDir::new().unwrap();
        let entry = pair(&dir, b"hello", Some(b"hello"));
        assert_eq!(compare_entry(&entry, HashAlgorithm::Blake3).unwrap(), Comparison::Identical);
    }

    #[test]
    fn test_empty_files_identical_without_reading() {
        let dir = TempDir::new().unwrap();
        let entry = Entry {
            // Source path does not exist; a zero-length match must not touch it
            source: dir.path().join("never-read"),
            destination: dir.path().join("empty"),
            size: 0,
            is_dir: false,
        };
        std::fs::write(&entry.destination, b"").unwrap();
        assert_eq!(compare_entry(&entry, HashAlgorithm::XXHash3).unwrap(), Comparison::Identical);
    }

    #[test]
    fn test_destination_is_directory() {
        let dir = TempDir::new().unwrap();
        let entry = pair(&dir, b"hello", None);
        std::fs::create_dir(&entry.destination).unwrap();
        assert_eq!(compare_entry(&entry, HashAlgorithm::XXHash3).unwrap(), Comparison::NotAFile);
    }

    #[test]
    fn test_destination_under_a_file_needs_copy() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"hello").unwrap();
        // A regular file where the destination's parent directory should be
        std::fs::write(dir.path().join("blocker"), b"").unwrap();

        let entry = entry_for(&src, &dir.path().join("blocker/src"));
        let comparison = compare_entry(&entry, HashAlgorithm::XXHash3).unwrap();
        assert_eq!(comparison, Comparison::Unknown);
        assert!(comparison.needs_copy());
    }

    #[test]
    fn test_hash_read_error_is_err() {
        let dir = TempDir::new().unwrap();
        let d = dir.path().join("dst");
        std::fs::write(&d, b"12345").unwrap();
        let entry = Entry {
            source: dir.path().join("vanished"),
            destination: d,
            size: 5,
            is_dir: false,
        };
        assert!(compare_entry(&entry, HashAlgorithm::XXHash3).is_err());
    }

    fn run_pool(entries: Vec<Entry>, workers: usize) -> (Vec<CopyCandidate>, Arc<SyncCounters>) {
        let (tx, rx) = channel::unbounded();
        for entry in entries {
            tx.send(entry).unwrap();
        }
        drop(tx);

        let counters = Arc::new(SyncCounters::default());
        let options = ComparatorOptions {
            workers,
            ..Default::default()
        };
        let (out, pool) = ComparatorPool::spawn(rx, CancelToken::new(), options, Arc::clone(&counters)).unwrap();
        assert_eq!(pool.len(), workers);

        let candidates: Vec<_> = out.iter().collect();
        pool.join().unwrap();
        (candidates, counters)
    }

    #[test]
    fn test_pool_forwards_only_differing() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let mut entries = Vec::new();
        for i in 0..50 {
            let s = src.path().join(format!("f{i}"));
            let d = dst.path().join(format!("f{i}"));
            std::fs::write(&s, format!("content {i}")).unwrap();
            if i % 2 == 0 {
                std::fs::write(&d, format!("content {i}")).unwrap();
            }
            entries.push(entry_for(&s, &d));
        }

        let (candidates, counters) = run_pool(entries, 4);

        assert_eq!(candidates.len(), 25);
        assert!(candidates.iter().all(|c| c.error.is_none()));
        let snap = counters.snapshot();
        assert_eq!(snap.files_examined, 50);
        assert_eq!(snap.files_identical, 25);
    }

    #[test]
    fn test_pool_absorbs_hash_failures() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let good = src.path().join("good");
        std::fs::write(&good, b"fresh").unwrap();
        // Same-size destination forces a hash of a source that no longer exists
        std::fs::write(dst.path().join("gone"), b"12345").unwrap();
        let gone = Entry {
            source: src.path().join("gone"),
            destination: dst.path().join("gone"),
            size: 5,
            is_dir: false,
        };

        let (candidates, counters) = run_pool(vec![gone, entry_for(&good, &dst.path().join("good"))], 2);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, good);
        let snap = counters.snapshot();
        assert_eq!(snap.compare_failed, 1);
        assert_eq!(snap.files_examined, 1);
    }

    #[test]
    fn test_pool_examines_each_entry_once() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let entries: Vec<_> = (0..200)
            .map(|i| {
                let s = src.path().join(format!("f{i}"));
                std::fs::write(&s, b"x").unwrap();
                entry_for(&s, &dst.path().join(format!("f{i}")))
            })
            .collect();

        let (candidates, _) = run_pool(entries, 20);

        let mut seen: Vec<_> = candidates.iter().map(|c| c.source.clone()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 200);
        assert_eq!(candidates.len(), 200);
    }

    #[test]
    fn test_pool_stops_on_cancel() {
        let (entry_tx, entry_rx) = channel::bounded::<Entry>(0);
        let cancel = CancelToken::new();
        let (out, pool) = ComparatorPool::spawn(
            entry_rx,
            cancel.clone(),
            ComparatorOptions {
                workers: 3,
                ..Default::default()
            },
            Arc::new(SyncCounters::default()),
        )
        .unwrap();

        // Workers are blocked waiting for input that never comes
        cancel.cancel();
        pool.join().unwrap();
        assert!(out.recv().is_err());
        drop(entry_tx);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (_tx, rx) = channel::unbounded::<Entry>();
        let options = ComparatorOptions {
            workers: 0,
            ..Default::default()
        };
        assert!(ComparatorPool::spawn(rx, CancelToken::new(), options, Arc::new(SyncCounters::default())).is_err());
    }
}
