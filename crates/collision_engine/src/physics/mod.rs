//! Collision detection and response
//!
//! The pipeline is split into the classic two phases: a broad phase that
//! quickly culls pairs that cannot possibly be colliding using the uniform
//! grid, and a narrow phase that runs exact shape-to-shape tests on the
//! surviving candidates. Response turns the resulting contacts into
//! velocity/position corrections for gameplay code to apply.

pub mod broad_phase;
pub mod contact;
pub mod narrow_phase;
pub mod response;

pub use broad_phase::PairBatch;
pub use contact::{ContactEvent, ContactKind, PairMode};
