//! Path predicates shared by the walker and the comparator
//!
//! All functions are stateless probes against the live filesystem.

use crate::error::{IoResultExt, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Check whether anything exists at `path`.
///
/// Errors other than "not found" (for example a permission denial on a
/// parent) are treated as "exists", so callers fall through to a probe that
/// reports the real problem.
pub fn file_exists(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(_) => true,
        Err(e) => e.kind() != ErrorKind::NotFound,
    }
}

/// Check whether a directory has no entries
pub fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = std::fs::read_dir(path).with_path(path)?;
    match entries.next() {
        None => Ok(true),
        Some(Ok(_)) => Ok(false),
        Some(Err(e)) => Err(e).with_path(path),
    }
}

/// Size of the file at `path` in bytes
pub fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path).with_path(path)?.len())
}

/// Probe whether a file can be opened for reading.
///
/// A permission denial is a `false`, any other failure is an error.
pub fn is_readable(path: &Path) -> Result<bool> {
    match File::open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Ok(false),
        Err(e) => Err(e).with_path(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("present.txt");
        std::fs::write(&path, b"x").unwrap();

        assert!(file_exists(&path));
        assert!(file_exists(dir.path()));
        assert!(!file_exists(&dir.path().join("absent.txt")));
    }

    #[test]
    fn test_file_exists_under_regular_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plain"), b"x").unwrap();

        // ENOTDIR is not "absent"
        let nested = dir.path().join("plain/child");
        assert!(file_exists(&nested));
        assert!(file_size(&nested).is_err());
    }

    #[test]
    fn test_is_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(is_empty_dir(dir.path()).unwrap());

        std::fs::write(dir.path().join("file"), b"content").unwrap();
        assert!(!is_empty_dir(dir.path()).unwrap());
    }

    #[test]
    fn test_is_empty_dir_missing() {
        let dir = TempDir::new().unwrap();
        assert!(is_empty_dir(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_file_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("five");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(file_size(&path).unwrap(), 5);
    }

    #[test]
    fn test_plain_file_is_readable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rw.txt");
        std::fs::write(&path, b"data").unwrap();

        assert!(is_readable(&path).unwrap());
    }

    #[test]
    fn test_probe_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(is_readable(&dir.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, b"top secret").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits
        if File::open(&path).is_err() {
            assert!(!is_readable(&path).unwrap());
        }

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }
}
