//! Progress reporting module
//!
//! Shared atomic counters for the pipeline and an optional spinner that
//! renders them.

mod reporter;

pub use reporter::*;
