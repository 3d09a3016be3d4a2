//! Spatial partitioning for broad-phase collision detection

mod grid;

pub use grid::{CellKey, UniformGrid};
