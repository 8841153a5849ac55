//! Speed adjuster workspace.
//!
//! Re-exports the adjuster, the safety clamp and the drive simulation so integration tests
//! can exercise them through one crate.

pub use controller::*;
pub use safety::*;
pub use sim::*;
