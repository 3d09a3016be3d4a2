//! Math utilities and types
//!
//! Provides the fundamental 2D math types used throughout the engine.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f64>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f64>;
