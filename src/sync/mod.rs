//! Post-sync tree verification
//!
//! Re-hashes every source file against its mirror to confirm a destination
//! tree matches its source.

mod verify;

pub use verify::*;
