//! Configuration module for DirSync
//!
//! Provides CLI arguments and the runtime settings of a sync session.

mod settings;

pub use settings::*;
