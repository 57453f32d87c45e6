//! File operations used by the pipeline
//!
//! Whole-file buffered copy, idempotent directory creation and the
//! source-to-destination path mapping.

use crate::error::{Result, SyncError};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Copy operation statistics
#[derive(Debug, Clone, Default)]
pub struct CopyStats {
    /// Bytes copied
    pub bytes_copied: u64,
    /// Duration of the copy
    pub duration: Duration,
}

/// Options for file copy operations
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Buffer size for reader and writer
    pub buffer_size: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 1024, // 1MB
        }
    }
}

/// Whole-file copier
#[derive(Debug, Clone, Default)]
pub struct FileCopier {
    options: CopyOptions,
}

impl FileCopier {
    /// Create a copier with the given options
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }

    /// Copy `source` over `dest`, truncating any existing content.
    ///
    /// Failures are reported as [`SyncError::Transfer`] against the path
    /// that failed. A failed copy may leave a truncated destination file.
    pub fn copy(&self, source: &Path, dest: &Path) -> Result<CopyStats> {
        let start = Instant::now();

        let src_file = File::open(source).map_err(|e| SyncError::transfer(source, e))?;
        let dst_file = File::create(dest).map_err(|e| SyncError::transfer(dest, e))?;

        let mut reader = BufReader::with_capacity(
            self.options.buffer_size,
            SourceReader {
                inner: src_file,
                failed: false,
            },
        );
        let mut writer = BufWriter::with_capacity(self.options.buffer_size, dst_file);

        let bytes_copied = std::io::copy(&mut reader, &mut writer).map_err(|e| {
            if reader.get_ref().failed {
                SyncError::transfer(source, e)
            } else {
                SyncError::transfer(dest, e)
            }
        })?;

        writer.flush().map_err(|e| SyncError::transfer(dest, e))?;

        Ok(CopyStats {
            bytes_copied,
            duration: start.elapsed(),
        })
    }
}

/// Remembers whether a read failed, so a copy error can be pinned on the
/// source or the destination
struct SourceReader {
    inner: File,
    failed: bool,
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if e.kind() != std::io::ErrorKind::Interrupted {
                self.failed = true;
            }
        })
    }
}

/// Create a directory and its parents; a no-op if it already exists
pub fn ensure_dir(path: &Path) -> std::io::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}

/// Map a path under `src_root` onto the same relative location under `dst_root`
pub fn mirror_path(src_root: &Path, dst_root: &Path, path: &Path) -> Result<PathBuf> {
    let relative = path.strip_prefix(src_root).map_err(|_| {
        SyncError::config(format!(
            "'{}' is not under source root '{}'",
            path.display(),
            src_root.display()
        ))
    })?;
    Ok(dst_root.join(relative))
}
