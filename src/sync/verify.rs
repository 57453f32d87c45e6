//! Tree verification
//!
//! Walks the source root, then hashes each file and its mirror in parallel
//! on the rayon pool. Nothing is written to either tree.

use crate::config::HashAlgorithm;
use crate::error::{Result, SyncError};
use crate::hash::verify_files_match;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// A file whose mirror has different content
#[derive(Debug, Clone, Serialize)]
pub struct FileMismatch {
    /// Path relative to the roots
    pub path: PathBuf,
    /// Digest of the source file
    pub source_hash: String,
    /// Digest of the destination file
    pub dest_hash: String,
}

/// Result of comparing two trees
#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeVerification {
    /// Files present on both sides with equal content
    pub matching: u64,
    /// Source files with no mirror (relative paths)
    pub missing: Vec<PathBuf>,
    /// Files whose content differs
    pub mismatched: Vec<FileMismatch>,
    /// Files that could not be read on either side, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
    /// Wall-clock time
    #[serde(skip)]
    pub duration: Duration,
}

impl TreeVerification {
    /// Every source file has an identical mirror
    pub fn is_identical(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && self.unreadable.is_empty()
    }

    /// Number of files examined
    pub fn total(&self) -> u64 {
        self.matching + (self.missing.len() + self.mismatched.len() + self.unreadable.len()) as u64
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\n=== Verification ===");
        println!("Matching:   {}", self.matching);
        println!("Missing:    {}", self.missing.len());
        println!("Mismatched: {}", self.mismatched.len());
        println!("Unreadable: {}", self.unreadable.len());
        println!("Duration:   {:.2?}", self.duration);

        for path in &self.missing {
            println!("  missing    {}", path.display());
        }
        for mismatch in &self.mismatched {
            println!(
                "  mismatch   {} ({} != {})",
                mismatch.path.display(),
                mismatch.source_hash,
                mismatch.dest_hash
            );
        }
        for (path, reason) in &self.unreadable {
            println!("  unreadable {} - {}", path.display(), reason);
        }
    }
}

enum Outcome {
    Match,
    Missing(PathBuf),
    Mismatch(FileMismatch),
    Unreadable(PathBuf, String),
}

/// Compare every regular file under `source` with its mirror under `destination`
pub fn verify_trees(source: &Path, destination: &Path, algorithm: HashAlgorithm) -> Result<TreeVerification> {
    let start = Instant::now();
    for root in [source, destination] {
        if !root.is_dir() {
            return Err(SyncError::NotADirectory(root.to_path_buf()));
        }
    }

    let mut report = TreeVerification::default();
    let mut files = Vec::new();

    for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Ok(rel) = entry.path().strip_prefix(source) {
                    files.push(rel.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
                let io_err: std::io::Error = err.into();
                if io_err.kind() != std::io::ErrorKind::PermissionDenied {
                    return Err(SyncError::traversal(path, io_err));
                }
                let rel = path.strip_prefix(source).map(Path::to_path_buf).unwrap_or(path);
                report.unreadable.push((rel, io_err.to_string()));
            }
        }
    }

    tracing::debug!(files = files.len(), "verifying");

    let outcomes: Vec<Outcome> = files
        .into_par_iter()
        .map(|rel| {
            let src = source.join(&rel);
            let dst = destination.join(&rel);
            if !dst.is_file() {
                return Outcome::Missing(rel);
            }
            match verify_files_match(&src, &dst, algorithm) {
                Ok(result) if result.matches => Outcome::Match,
                Ok(result) => Outcome::Mismatch(FileMismatch {
                    path: rel,
                    source_hash: result.source_hash.hash,
                    dest_hash: result.dest_hash.hash,
                }),
                Err(e) => Outcome::Unreadable(rel, e.to_string()),
            }
        })
        .collect();

    for outcome in outcomes {
        match outcome {
            Outcome::Match => report.matching += 1,
            Outcome::Missing(path) => report.missing.push(path),
            Outcome::Mismatch(mismatch) => report.mismatched.push(mismatch),
            Outcome::Unreadable(path, reason) => report.unreadable.push((path, reason)),
        }
    }

    report.duration = start.elapsed();
    Ok(report)
}
