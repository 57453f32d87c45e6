//! Copy stage
//!
//! Drains the candidate stream on the calling thread and performs each
//! transfer. The first failed transfer ends the stage; candidates carrying a
//! reason are logged and left alone.

use crate::core::{CancelToken, CopyCandidate};
use crate::error::Result;
use crate::fs::FileCopier;
use crate::progress::{ProgressReporter, SyncCounters};
use crossbeam::channel::Receiver;
use std::sync::Arc;

/// Sequential consumer of copy candidates
pub struct CopyStage {
    copier: FileCopier,
    counters: Arc<SyncCounters>,
    verbose: bool,
    dry_run: bool,
}

impl CopyStage {
    /// Create a copy stage
    pub fn new(copier: FileCopier, counters: Arc<SyncCounters>) -> Self {
        Self {
            copier,
            counters,
            verbose: false,
            dry_run: false,
        }
    }

    /// Log skipped candidates
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Count candidates without copying them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Consume `candidates` until the stream closes.
    ///
    /// Returns the number of files copied, or in dry-run mode the number that
    /// would have been. Cancellation stops consumption without error; the
    /// session decides whether it matters. A failed transfer is returned
    /// immediately and the remaining candidates are left unread.
    pub fn drain(
        &self,
        candidates: &Receiver<CopyCandidate>,
        cancel: &CancelToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<u64> {
        let verbose = self.verbose;
        let mut copied = 0u64;

        loop {
            let candidate = crossbeam::select! {
                recv(candidates) -> msg => match msg {
                    Ok(candidate) => candidate,
                    Err(_) => break,
                },
                recv(cancel.done()) -> _ => break,
            };

            if let Some(reason) = &candidate.error {
                diag!(verbose, path = %candidate.destination.display(), %reason, "not copying");
                SyncCounters::add(&self.counters.copy_skipped, 1);
                continue;
            }

            if self.dry_run {
                tracing::info!(
                    "would copy {} -> {}",
                    candidate.source.display(),
                    candidate.destination.display()
                );
                copied += 1;
                SyncCounters::add(&self.counters.files_copied, 1);
                continue;
            }

            let stats = self.copier.copy(&candidate.source, &candidate.destination)?;
            tracing::debug!(
                path = %candidate.destination.display(),
                bytes = stats.bytes_copied,
                elapsed = ?stats.duration,
                "copied"
            );

            copied += 1;
            SyncCounters::add(&self.counters.files_copied, 1);
            SyncCounters::add(&self.counters.bytes_copied, stats.bytes_copied);

            if let Some(progress) = progress {
                progress.update(&self.counters);
            }
        }

        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crossbeam::channel;
    use std::path::Path;
    use tempfile::TempDir;

    fn candidate(src: &Path, dst: &Path, error: Option<&str>) -> CopyCandidate {
        CopyCandidate {
            source: src.to_path_buf(),
            destination: dst.to_path_buf(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_drain_copies_and_counts() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = channel::unbounded();
        for i in 0..3 {
            let src = dir.path().join(format!("s{i}"));
            std::fs::write(&src, vec![b'x'; 10]).unwrap();
            tx.send(candidate(&src, &dir.path().join(format!("d{i}")), None)).unwrap();
        }
        drop(tx);

        let counters = Arc::new(SyncCounters::default());
        let stage = CopyStage::new(FileCopier::default(), Arc::clone(&counters));
        let copied = stage.drain(&rx, &CancelToken::new(), None).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(counters.snapshot().bytes_copied, 30);
        assert_eq!(std::fs::read(dir.path().join("d2")).unwrap(), vec![b'x'; 10]);
    }

    #[test]
    fn test_candidate_with_reason_is_skipped() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"data").unwrap();

        let (tx, rx) = channel::unbounded();
        tx.send(candidate(&src, &dst, Some("destination is a directory"))).unwrap();
        drop(tx);

        let counters = Arc::new(SyncCounters::default());
        let stage = CopyStage::new(FileCopier::default(), Arc::clone(&counters));
        assert_eq!(stage.drain(&rx, &CancelToken::new(), None).unwrap(), 0);
        assert!(!dst.exists());
        assert_eq!(counters.snapshot().copy_skipped, 1);
    }

    #[test]
    fn test_transfer_failure_stops_stage() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"data").unwrap();

        let (tx, rx) = channel::unbounded();
        tx.send(candidate(&src, &dir.path().join("missing/parent/dst"), None)).unwrap();
        tx.send(candidate(&src, &dir.path().join("ok"), None)).unwrap();
        drop(tx);

        let stage = CopyStage::new(FileCopier::default(), Arc::new(SyncCounters::default()));
        let err = stage.drain(&rx, &CancelToken::new(), None).unwrap_err();
        assert!(matches!(err, SyncError::Transfer { .. }));
        assert!(!dir.path().join("ok").exists());
    }

    #[test]
    fn test_dry_run_copies_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"data").unwrap();

        let (tx, rx) = channel::unbounded();
        tx.send(candidate(&src, &dst, None)).unwrap();
        drop(tx);

        let stage = CopyStage::new(FileCopier::default(), Arc::new(SyncCounters::default())).with_dry_run(true);
        assert_eq!(stage.drain(&rx, &CancelToken::new(), None).unwrap(), 1);
        assert!(!dst.exists());
    }

    #[test]
    fn test_cancel_ends_drain() {
        let (_tx, rx) = channel::unbounded::<CopyCandidate>();
        let cancel = CancelToken::new();
        cancel.cancel();

        let stage = CopyStage::new(FileCopier::default(), Arc::new(SyncCounters::default()));
        assert_eq!(stage.drain(&rx, &cancel, None).unwrap(), 0);
    }
}
