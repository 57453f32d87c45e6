//! Content digests for file comparison
//!
//! Provides XXHash3, XXHash64, BLAKE3 and SHA-256 with streaming reads so
//! the comparator never loads a whole file into memory.

mod integrity;

pub use integrity::*;
