//! File system operations module
//!
//! Path classification, the source tree walker and whole-file copying.

pub mod classify;
mod operations;
mod walker;

pub use operations::*;
pub use walker::*;
