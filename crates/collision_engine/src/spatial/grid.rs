//! Uniform-cell hash grid spatial index
//!
//! Buckets entities into integer cells by floor-dividing their position by
//! a fixed cell size. Insert, remove and update are O(1) amortized;
//! neighborhood queries touch only the cells covering the query range, so
//! their cost scales with local density rather than population size.
//!
//! The grid is maintained incrementally as entities move; it is never
//! rebuilt from scratch during normal ticks. [`UniformGrid::rebuild`] is
//! the recovery path after a world reset.

use std::collections::{HashMap, HashSet};

use crate::entity::{EntitySnapshot, Role};
use crate::foundation::math::Point2;

/// Integer cell coordinates (floor-divided world position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    /// Cell column.
    pub x: i32,
    /// Cell row.
    pub y: i32,
}

/// Membership of one occupied cell, split by role so the broad phase can
/// pair objects against objects and against obstacles separately.
/// Pickups (and unknown-role entities) share the objects set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Cell {
    objects: HashSet<u32>,
    obstacles: HashSet<u32>,
}

impl Cell {
    fn members_mut(&mut self, role: Role) -> &mut HashSet<u32> {
        match role {
            Role::Obstacle => &mut self.obstacles,
            Role::Object | Role::Pickup | Role::Unknown => &mut self.objects,
        }
    }

    fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.obstacles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntityRecord {
    cell: CellKey,
    role: Role,
}

/// Uniform-cell spatial hash grid.
///
/// Owned by the tick loop and constructor-injected into whatever needs
/// it; there is deliberately no global accessor.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    cell_size: f64,
    cells: HashMap<CellKey, Cell>,
    entities: HashMap<u32, EntityRecord>,
}

impl UniformGrid {
    /// Create an empty grid with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-6),
            cells: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    /// Configured cell size.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Cell containing a world position.
    pub fn cell_key(&self, position: &Point2) -> CellKey {
        CellKey {
            x: (position.x / self.cell_size).floor() as i32,
            y: (position.y / self.cell_size).floor() as i32,
        }
    }

    /// Insert an entity. An id that is already present is moved to the new
    /// position/role rather than duplicated.
    pub fn insert(&mut self, numeric_id: u32, position: &Point2, role: Role) {
        self.remove(numeric_id);
        let cell = self.cell_key(position);
        self.cells.entry(cell).or_default().members_mut(role).insert(numeric_id);
        self.entities.insert(numeric_id, EntityRecord { cell, role });
    }

    /// Remove an entity. Removing an id that is not present is a no-op so
    /// callers can clean up defensively.
    pub fn remove(&mut self, numeric_id: u32) {
        if let Some(record) = self.entities.remove(&numeric_id) {
            if let Some(cell) = self.cells.get_mut(&record.cell) {
                cell.members_mut(record.role).remove(&numeric_id);
                if cell.is_empty() {
                    self.cells.remove(&record.cell);
                }
            }
        }
    }

    /// Move an entity to a new position. Membership only changes when the
    /// computed cell changes; same-cell motion skips the grid churn
    /// entirely. Unknown ids are ignored (the caller inserts first).
    pub fn update_position(&mut self, numeric_id: u32, position: &Point2) {
        let Some(record) = self.entities.get(&numeric_id).copied() else {
            return;
        };
        let new_cell = self.cell_key(position);
        if new_cell == record.cell {
            return;
        }

        if let Some(cell) = self.cells.get_mut(&record.cell) {
            cell.members_mut(record.role).remove(&numeric_id);
            if cell.is_empty() {
                self.cells.remove(&record.cell);
            }
        }
        self.cells
            .entry(new_cell)
            .or_default()
            .members_mut(record.role)
            .insert(numeric_id);
        self.entities.insert(numeric_id, EntityRecord { cell: new_cell, role: record.role });
    }

    /// Entities whose cells intersect `point ± radius`, optionally
    /// narrowed by role.
    ///
    /// This is a broad-phase over-approximation: membership is unioned at
    /// cell granularity and no per-entity distance check is applied, so
    /// callers must still verify actual overlap. A filter that matches no
    /// membership yields an empty set, never an error. Filtering by
    /// `Object`, `Pickup` or `Unknown` returns the shared objects set.
    pub fn query_nearby(&self, point: &Point2, radius: f64, filter: Option<Role>) -> HashSet<u32> {
        let min = self.cell_key(&Point2::new(point.x - radius, point.y - radius));
        let max = self.cell_key(&Point2::new(point.x + radius, point.y + radius));

        let mut result = HashSet::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                if let Some(cell) = self.cells.get(&CellKey { x, y }) {
                    match filter {
                        Some(Role::Obstacle) => result.extend(&cell.obstacles),
                        Some(_) => result.extend(&cell.objects),
                        None => {
                            result.extend(&cell.objects);
                            result.extend(&cell.obstacles);
                        }
                    }
                }
            }
        }
        result
    }

    /// The 3×3 neighborhood of a cell, including the cell itself.
    pub(crate) fn neighborhood(cell: CellKey) -> [CellKey; 9] {
        let mut keys = [cell; 9];
        let mut i = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                keys[i] = CellKey { x: cell.x + dx, y: cell.y + dy };
                i += 1;
            }
        }
        keys
    }

    /// Keys of every occupied cell. Empty cells are pruned eagerly, so all
    /// stored cells count.
    pub(crate) fn occupied_cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.keys().copied()
    }

    /// Object-set membership of a cell, if occupied.
    pub(crate) fn objects_in(&self, cell: CellKey) -> Option<&HashSet<u32>> {
        self.cells.get(&cell).map(|c| &c.objects)
    }

    /// Obstacle-set membership of a cell, if occupied.
    pub(crate) fn obstacles_in(&self, cell: CellKey) -> Option<&HashSet<u32>> {
        self.cells.get(&cell).map(|c| &c.obstacles)
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop all membership.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entities.clear();
    }

    /// Rebuild membership from scratch. Recovery path after a world reset
    /// or detected inconsistency; normal ticks maintain the grid
    /// incrementally instead.
    pub fn rebuild<'a>(&mut self, snapshots: impl IntoIterator<Item = &'a EntitySnapshot>) {
        self.clear();
        for snapshot in snapshots {
            self.insert(snapshot.numeric_id, &snapshot.position, snapshot.role);
        }
    }

    /// Compare live membership against a freshly derived grid from the
    /// same snapshots: no stale entries, no duplicates, no phantom cells.
    pub fn consistent_with<'a>(&self, snapshots: impl IntoIterator<Item = &'a EntitySnapshot>) -> bool {
        let mut fresh = Self::new(self.cell_size);
        for snapshot in snapshots {
            fresh.insert(snapshot.numeric_id, &snapshot.position, snapshot.role);
        }
        self.cells == fresh.cells && self.entities == fresh.entities
    }

    #[cfg(test)]
    fn cell_of(&self, numeric_id: u32) -> Option<CellKey> {
        self.entities.get(&numeric_id).map(|r| r.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, Shape};

    fn snapshot(numeric_id: u32, x: f64, y: f64, role: Role) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(format!("e{numeric_id}")),
            numeric_id,
            position: Point2::new(x, y),
            shape: Shape::Circle { diameter: 8.0 },
            role,
            asleep: false,
        }
    }

    #[test]
    fn insert_and_query_by_role() {
        let mut grid = UniformGrid::new(32.0);
        grid.insert(1, &Point2::new(10.0, 10.0), Role::Object);
        grid.insert(2, &Point2::new(20.0, 10.0), Role::Obstacle);
        grid.insert(3, &Point2::new(500.0, 500.0), Role::Object);

        let near = grid.query_nearby(&Point2::new(15.0, 10.0), 16.0, None);
        assert!(near.contains(&1) && near.contains(&2));
        assert!(!near.contains(&3));

        let obstacles = grid.query_nearby(&Point2::new(15.0, 10.0), 16.0, Some(Role::Obstacle));
        assert_eq!(obstacles, HashSet::from([2]));

        let objects = grid.query_nearby(&Point2::new(15.0, 10.0), 16.0, Some(Role::Object));
        assert_eq!(objects, HashSet::from([1]));
    }

    #[test]
    fn query_with_no_match_is_empty() {
        let grid = UniformGrid::new(32.0);
        assert!(grid.query_nearby(&Point2::new(0.0, 0.0), 100.0, Some(Role::Obstacle)).is_empty());
    }

    #[test]
    fn negative_coordinates_floor_correctly() {
        let grid = UniformGrid::new(32.0);
        assert_eq!(grid.cell_key(&Point2::new(-1.0, -1.0)), CellKey { x: -1, y: -1 });
        assert_eq!(grid.cell_key(&Point2::new(-32.0, 0.0)), CellKey { x: -1, y: 0 });
        assert_eq!(grid.cell_key(&Point2::new(0.0, 0.0)), CellKey { x: 0, y: 0 });
    }

    #[test]
    fn same_cell_update_keeps_membership() {
        let mut grid = UniformGrid::new(32.0);
        grid.insert(1, &Point2::new(5.0, 5.0), Role::Object);
        let before = grid.cell_of(1).unwrap();

        grid.update_position(1, &Point2::new(20.0, 20.0));
        assert_eq!(grid.cell_of(1).unwrap(), before);

        grid.update_position(1, &Point2::new(40.0, 5.0));
        assert_ne!(grid.cell_of(1).unwrap(), before);
        // The old cell must not retain a stale reference.
        let stale = grid.query_nearby(&Point2::new(5.0, 5.0), 1.0, None);
        assert!(!stale.contains(&1));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut grid = UniformGrid::new(32.0);
        grid.insert(1, &Point2::new(5.0, 5.0), Role::Object);
        grid.remove(1);
        grid.remove(1);
        grid.remove(42);
        assert!(grid.is_empty());
    }

    #[test]
    fn reinsert_moves_instead_of_duplicating() {
        let mut grid = UniformGrid::new(32.0);
        grid.insert(1, &Point2::new(5.0, 5.0), Role::Object);
        grid.insert(1, &Point2::new(100.0, 100.0), Role::Obstacle);
        assert_eq!(grid.len(), 1);
        assert!(grid.query_nearby(&Point2::new(5.0, 5.0), 1.0, None).is_empty());
        assert!(grid
            .query_nearby(&Point2::new(100.0, 100.0), 1.0, Some(Role::Obstacle))
            .contains(&1));
    }

    #[test]
    fn neighborhood_covers_three_by_three() {
        let keys = UniformGrid::neighborhood(CellKey { x: 0, y: 0 });
        let unique: HashSet<_> = keys.iter().copied().collect();
        assert_eq!(unique.len(), 9);
        assert!(unique.contains(&CellKey { x: 0, y: 0 }));
        assert!(unique.contains(&CellKey { x: -1, y: 1 }));
        assert!(unique.contains(&CellKey { x: 1, y: -1 }));
    }

    #[test]
    fn random_churn_matches_fresh_rebuild() {
        // Deterministic xorshift so the sequence is reproducible.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut rng = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut grid = UniformGrid::new(24.0);
        let mut live: HashMap<u32, EntitySnapshot> = HashMap::new();

        for _ in 0..2000 {
            let id = (rng() % 64) as u32;
            let x = (rng() % 2000) as f64 - 1000.0;
            let y = (rng() % 2000) as f64 - 1000.0;
            match rng() % 3 {
                0 => {
                    let role = if id % 5 == 0 { Role::Obstacle } else { Role::Object };
                    let snap = snapshot(id, x, y, role);
                    grid.insert(id, &snap.position, snap.role);
                    live.insert(id, snap);
                }
                1 => {
                    if let Some(snap) = live.get_mut(&id) {
                        snap.position = Point2::new(x, y);
                        grid.update_position(id, &snap.position);
                    }
                }
                _ => {
                    grid.remove(id);
                    live.remove(&id);
                }
            }
        }

        assert_eq!(grid.len(), live.len());
        assert!(grid.consistent_with(live.values()));
    }

    #[test]
    fn rebuild_recovers_from_corruption() {
        let mut grid = UniformGrid::new(32.0);
        let snapshots: Vec<_> = (0..10)
            .map(|i| snapshot(i, f64::from(i) * 50.0, 0.0, Role::Object))
            .collect();
        grid.rebuild(&snapshots);
        assert_eq!(grid.len(), 10);
        assert!(grid.consistent_with(&snapshots));
    }
}
