//! Sync pipeline
//!
//! Cancellation fabric, comparator worker pool, copy stage and the session
//! that runs them together.

mod cancel;
mod comparator;
mod copier;
mod session;

pub use cancel::*;
pub use comparator::*;
pub use copier::*;
pub use session::*;
