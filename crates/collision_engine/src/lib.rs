//! # Collision Engine
//!
//! Broad-phase and narrow-phase collision detection for real-time 2D
//! entity simulations.
//!
//! ## Features
//!
//! - **Uniform Spatial Hash Grid**: Sparse cell index with incremental
//!   per-tick maintenance and nearby queries
//! - **Broad Phase**: 3x3 neighborhood candidate generation with
//!   order-independent pair dedup and sleep-state skipping
//! - **Narrow Phase**: Exact rect/circle overlap tests with penetration
//!   depth and deterministic contact normals
//! - **Worker Pool**: Sharded parallel narrow phase with a timeout
//!   fail-open and a synchronous fallback sharing the same kernel
//! - **Collision Response**: Reflect-and-separate corrections reported
//!   through gameplay hooks, never applied to host state directly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let config = EngineConfig::default();
//!     let _engine = CollisionEngine::new(config)?;
//!
//!     // Each tick, hand the engine fresh snapshots and receive
//!     // contacts back through your GameplayHooks implementation:
//!     // let events = engine.tick(&store, &mut hooks);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod foundation;
pub mod geometry;
pub mod pair;
pub mod physics;
pub mod spatial;

mod engine;

pub use config::{EngineConfig, Viewport};
pub use engine::CollisionEngine;
pub use error::{EngineError, EngineResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        CollisionEngine, EngineConfig, EngineError, EngineResult, Viewport,
        entity::{EntityId, EntitySnapshot, EntityStore, GameplayHooks, Role, Shape},
        foundation::math::{Point2, Vec2},
        physics::{ContactEvent, ContactKind, PairMode},
        spatial::{CellKey, UniformGrid},
    };
}
