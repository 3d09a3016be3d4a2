//! Entity snapshots and collaborator interfaces
//!
//! The engine never owns entities. Each tick it is handed immutable
//! snapshots of the live population and reports results back by
//! identifier; entity storage, pooling and lifecycle stay with the host.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Point2, Vec2};

/// Stable opaque entity handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id from any string-like handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Gameplay role of an entity, used for pair filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Moving simulated object (ships, projectiles, debris).
    Object,
    /// Static world geometry.
    Obstacle,
    /// Collectible; shares grid membership with objects.
    Pickup,
    /// Role could not be determined; never produces contacts.
    Unknown,
}

/// Collision shape, stored as a tagged variant so the geometry kernel can
/// match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned rectangle.
    Rect {
        /// Full width.
        width: f64,
        /// Full height.
        height: f64,
    },
    /// Circle described by its diameter.
    Circle {
        /// Full diameter.
        diameter: f64,
    },
}

impl Shape {
    /// Half-extents of the shape's bounding box.
    pub fn half_extents(&self) -> Vec2 {
        match self {
            Self::Rect { width, height } => Vec2::new(width / 2.0, height / 2.0),
            Self::Circle { diameter } => Vec2::new(diameter / 2.0, diameter / 2.0),
        }
    }
}

/// Immutable per-tick view of one simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Stable opaque handle, reported back to gameplay code.
    pub id: EntityId,
    /// Dense integer id, unique among live entities; reused only after the
    /// original entity is fully retired.
    pub numeric_id: u32,
    /// World position (shape center).
    pub position: Point2,
    /// Collision shape.
    pub shape: Shape,
    /// Pair-filtering role.
    pub role: Role,
    /// Entity has not moved meaningfully since last tick; asleep-asleep
    /// pairs are skipped by the broad phase.
    pub asleep: bool,
}

/// Per-tick lookup table over entity snapshots, indexed both by dense
/// numeric id (narrow phase) and by opaque handle (response, queries).
#[derive(Debug, Default, Clone)]
pub struct SnapshotTable {
    by_numeric: HashMap<u32, EntitySnapshot>,
    numeric_by_id: HashMap<EntityId, u32>,
}

impl SnapshotTable {
    /// Build a table from a tick's snapshots.
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = EntitySnapshot>) -> Self {
        let mut table = Self::default();
        for snapshot in snapshots {
            table.numeric_by_id.insert(snapshot.id.clone(), snapshot.numeric_id);
            table.by_numeric.insert(snapshot.numeric_id, snapshot);
        }
        table
    }

    /// Look up a snapshot by dense numeric id.
    pub fn get(&self, numeric_id: u32) -> Option<&EntitySnapshot> {
        self.by_numeric.get(&numeric_id)
    }

    /// Look up a snapshot by opaque handle.
    pub fn get_by_id(&self, id: &EntityId) -> Option<&EntitySnapshot> {
        self.numeric_by_id.get(id).and_then(|n| self.by_numeric.get(n))
    }

    /// Whether a numeric id is present this tick.
    pub fn contains(&self, numeric_id: u32) -> bool {
        self.by_numeric.contains_key(&numeric_id)
    }

    /// Iterate all snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.by_numeric.values()
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.by_numeric.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_numeric.is_empty()
    }
}

/// Read-only view of the host's entity/component store.
pub trait EntityStore {
    /// Produce fresh snapshots of every live entity for the current tick.
    fn snapshots(&self) -> Vec<EntitySnapshot>;

    /// Current velocity of an entity, if it has one. Used by the collision
    /// response to compute the reflected velocity.
    fn velocity(&self, id: &EntityId) -> Option<Vec2>;
}

/// Callbacks into gameplay code. The engine computes corrections but never
/// applies them; the host decides what a contact means.
pub trait GameplayHooks {
    /// Two objects touched this tick (damage, triggers, pickups).
    fn on_object_object_contact(&mut self, a: &EntityId, b: &EntityId, normal: &Vec2, penetration: f64);

    /// An object hit an obstacle and the engine computed its corrected
    /// position and reflected velocity.
    fn on_object_obstacle_resolved(&mut self, id: &EntityId, new_position: Point2, new_velocity: Vec2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_table_lookups() {
        let snapshot = EntitySnapshot {
            id: EntityId::new("ship-1"),
            numeric_id: 7,
            position: Point2::new(1.0, 2.0),
            shape: Shape::Circle { diameter: 10.0 },
            role: Role::Object,
            asleep: false,
        };
        let table = SnapshotTable::from_snapshots([snapshot.clone()]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(7), Some(&snapshot));
        assert_eq!(table.get_by_id(&EntityId::new("ship-1")), Some(&snapshot));
        assert!(table.get(8).is_none());
    }

    #[test]
    fn shape_half_extents() {
        let rect = Shape::Rect { width: 10.0, height: 4.0 };
        assert_eq!(rect.half_extents(), Vec2::new(5.0, 2.0));
        let circle = Shape::Circle { diameter: 6.0 };
        assert_eq!(circle.half_extents(), Vec2::new(3.0, 3.0));
    }
}
