//! Error types for DirSync
//!
//! Session-fatal conditions are variants of [`SyncError`]. Per-entry faults
//! (permission denials, unreadable files during comparison) never become a
//! `SyncError`; the pipeline stage that hits them logs and drops the entry.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for DirSync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Source and destination canonicalize to the same directory
    #[error("Source and destination are the same: {0}")]
    SameSourceAndDestination(PathBuf),

    /// Destination lives inside the source tree
    #[error("Destination '{destination}' is inside source '{source_root}'")]
    DestinationInsideSource {
        /// Canonical source root
        source_root: PathBuf,
        /// Canonical destination root
        destination: PathBuf,
    },

    /// A root path is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Walking the source tree failed with something other than a permission error
    #[error("Traversal error at '{path}': {source}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the source or writing the destination failed during copy
    #[error("Transfer error at '{path}': {source}")]
    Transfer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside the pipeline stages
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline thread panicked
    #[error("Pipeline worker '{0}' panicked")]
    WorkerPanicked(String),

    /// Operation cancelled by the caller or by another failing stage
    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a traversal error
    pub fn traversal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Traversal {
            path: path.into(),
            source,
        }
    }

    /// Create a transfer error
    pub fn transfer(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Transfer {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this error is the cancellation sentinel
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error was raised before any traversal began
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::SameSourceAndDestination(_)
                | Self::DestinationInsideSource { .. }
                | Self::NotADirectory(_)
                | Self::Config(_)
        )
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::Io { source, .. }
            | Self::Traversal { source, .. }
            | Self::Transfer { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::Traversal { path, .. }
            | Self::Transfer { path, .. }
            | Self::NotADirectory(path)
            | Self::SameSourceAndDestination(path) => Some(path),
            Self::DestinationInsideSource { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

/// Result type alias for DirSync operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| SyncError::io(path, e))
    }
}
