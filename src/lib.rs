//! # DirSync - Concurrent One-Way Directory Sync
//!
//! DirSync makes a destination tree contain every regular file of a source
//! tree with identical content, copying only what is missing or different.
//! It never deletes anything from the destination.
//!
//! ## Pipeline
//!
//! - **Walker**: one thread walks the source depth-first, creates
//!   destination directories as it goes and emits file entries
//! - **Comparators**: a fixed pool of threads (20 by default) checks
//!   existence, then size, then a content digest
//! - **Copy stage**: the calling thread copies each differing file
//! - **Cancellation**: one token reaches every blocking handoff, so the
//!   first fatal error or a caller cancel stops all stages promptly
//!
//! ## Quick Start
//!
//! ```no_run
//! use dirsync::config::SyncConfig;
//! use dirsync::core::SyncSession;
//!
//! let mut session = SyncSession::new(SyncConfig::new("/data/src", "/data/backup")).unwrap();
//! let summary = session.sync().unwrap();
//!
//! println!("Copied {} files", session.total_copied());
//! summary.print_summary();
//! ```
//!
//! ## Cancellation
//!
//! ```no_run
//! use dirsync::config::SyncConfig;
//! use dirsync::core::{CancelToken, SyncSession};
//! use std::time::Duration;
//!
//! let cancel = CancelToken::new();
//! cancel.cancel_after(Duration::from_secs(60));
//!
//! let mut session = SyncSession::new(SyncConfig::new("/src", "/dst")).unwrap();
//! match session.sync_with(&cancel) {
//!     Ok(summary) => println!("done: {}", summary.files_copied()),
//!     Err(e) if e.is_cancelled() => println!("stopped after {} files", session.total_copied()),
//!     Err(e) => eprintln!("sync failed: {e}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Emit an `info` event only when the session runs verbose
macro_rules! diag {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        }
    };
}

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod hash;
pub mod progress;
pub mod sync;

// Re-export commonly used types
pub use config::{HashAlgorithm, SyncConfig};
pub use core::{CancelToken, SyncSession, SyncSummary};
pub use error::{Result, SyncError};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use dirsync::prelude::*;
    //! ```

    pub use crate::config::{HashAlgorithm, SyncConfig};
    pub use crate::core::{CancelToken, CopyCandidate, SyncSession, SyncSummary};
    pub use crate::error::{Result, SyncError};
    pub use crate::fs::{Entry, TreeWalker};
    pub use crate::hash::{hash_file, verify_files_match, HashResult};
    pub use crate::progress::ProgressReporter;
    pub use crate::sync::{verify_trees, TreeVerification};
}
