//! Broad-phase candidate pair generation
//!
//! Walks every occupied grid cell, unions the 3×3 neighborhood's
//! membership, and emits deduplicated candidate pairs for the requested
//! role pairing. Pairs are only candidates; the narrow phase still
//! verifies actual shape overlap.
//!
//! Deduplication is tick-scoped and computed here, single-threaded,
//! before any sharding: the same unordered pair shows up in several
//! overlapping neighborhoods, and downstream shards must never re-derive
//! their own dedup state or the at-most-one-contact-per-pair guarantee
//! breaks.

use std::collections::HashSet;

use crate::entity::SnapshotTable;
use crate::pair::pair_key;
use crate::physics::contact::PairMode;
use crate::spatial::UniformGrid;

/// Candidate pairs for one tick, plus the set of every referenced entity
/// (used to build the minimal snapshot bundle sent to the narrow phase).
#[derive(Debug, Default)]
pub struct PairBatch {
    /// Unordered candidate pairs by numeric id. For object-obstacle pairs
    /// the object comes first, though the narrow phase re-resolves roles
    /// rather than trusting the ordering.
    pub pairs: Vec<(u32, u32)>,
    /// Every numeric id referenced by at least one pair.
    pub referenced: HashSet<u32>,
}

impl PairBatch {
    fn push(&mut self, a: u32, b: u32) {
        self.pairs.push((a, b));
        self.referenced.insert(a);
        self.referenced.insert(b);
    }
}

/// Generate candidate pairs for every occupied cell neighborhood.
///
/// `checked` is the tick-scoped pair-key set; the caller clears it once
/// per tick and may pass it to several calls within the same tick (e.g.
/// separate object-object and object-obstacle passes) to keep pairs
/// globally unique.
pub fn generate_pairs(
    grid: &UniformGrid,
    table: &SnapshotTable,
    mode: PairMode,
    checked: &mut HashSet<u64>,
) -> PairBatch {
    let mut batch = PairBatch::default();

    for cell in grid.occupied_cells() {
        let mut local_objects: Vec<u32> = Vec::new();
        let mut local_obstacles: Vec<u32> = Vec::new();
        let mut seen = HashSet::new();

        for neighbor in UniformGrid::neighborhood(cell) {
            if let Some(objects) = grid.objects_in(neighbor) {
                local_objects.extend(objects.iter().filter(|id| seen.insert(**id)));
            }
            if let Some(obstacles) = grid.obstacles_in(neighbor) {
                local_obstacles.extend(obstacles.iter().filter(|id| seen.insert(**id)));
            }
        }

        if matches!(mode, PairMode::ObjectObject | PairMode::All) {
            object_object_pairs(&local_objects, table, checked, &mut batch);
        }
        if matches!(mode, PairMode::ObjectObstacle | PairMode::All) {
            object_obstacle_pairs(&local_objects, &local_obstacles, table, checked, &mut batch);
        }
    }

    batch
}

fn is_asleep(table: &SnapshotTable, numeric_id: u32) -> bool {
    // Missing snapshots count as awake; the narrow phase drops them anyway.
    table.get(numeric_id).is_some_and(|s| s.asleep)
}

fn object_object_pairs(
    objects: &[u32],
    table: &SnapshotTable,
    checked: &mut HashSet<u64>,
    batch: &mut PairBatch,
) {
    for (i, &a) in objects.iter().enumerate() {
        let a_asleep = is_asleep(table, a);
        for &b in &objects[i + 1..] {
            // Asleep-asleep pairs cannot have changed outcome since last
            // tick; skip them outright.
            if a_asleep && is_asleep(table, b) {
                continue;
            }
            if checked.insert(pair_key(a, b)) {
                batch.push(a, b);
            }
        }
    }
}

fn object_obstacle_pairs(
    objects: &[u32],
    obstacles: &[u32],
    table: &SnapshotTable,
    checked: &mut HashSet<u64>,
    batch: &mut PairBatch,
) {
    for &object in objects {
        // Obstacles are static; only the object's sleep state matters.
        if is_asleep(table, object) {
            continue;
        }
        for &obstacle in obstacles {
            if checked.insert(pair_key(object, obstacle)) {
                batch.push(object, obstacle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntitySnapshot, Role, Shape};
    use crate::foundation::math::Point2;

    fn snapshot(numeric_id: u32, x: f64, y: f64, role: Role, asleep: bool) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(format!("e{numeric_id}")),
            numeric_id,
            position: Point2::new(x, y),
            shape: Shape::Circle { diameter: 8.0 },
            role,
            asleep,
        }
    }

    fn setup(snapshots: Vec<EntitySnapshot>) -> (UniformGrid, SnapshotTable) {
        let mut grid = UniformGrid::new(32.0);
        for s in &snapshots {
            grid.insert(s.numeric_id, &s.position, s.role);
        }
        (grid, SnapshotTable::from_snapshots(snapshots))
    }

    fn sorted_pairs(batch: &PairBatch) -> Vec<(u32, u32)> {
        let mut pairs: Vec<_> = batch
            .pairs
            .iter()
            .map(|&(a, b)| if a <= b { (a, b) } else { (b, a) })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn pairs_in_same_cell() {
        let (grid, table) = setup(vec![
            snapshot(1, 5.0, 5.0, Role::Object, false),
            snapshot(2, 10.0, 5.0, Role::Object, false),
        ]);
        let mut checked = HashSet::new();
        let batch = generate_pairs(&grid, &table, PairMode::ObjectObject, &mut checked);
        assert_eq!(sorted_pairs(&batch), vec![(1, 2)]);
        assert_eq!(batch.referenced, HashSet::from([1, 2]));
    }

    #[test]
    fn pairs_across_adjacent_cells_deduplicated() {
        // Two occupied adjacent cells; each neighborhood sees both
        // entities, but only one pair may come out.
        let (grid, table) = setup(vec![
            snapshot(1, 5.0, 5.0, Role::Object, false),
            snapshot(2, 40.0, 5.0, Role::Object, false),
        ]);
        let mut checked = HashSet::new();
        let batch = generate_pairs(&grid, &table, PairMode::ObjectObject, &mut checked);
        assert_eq!(sorted_pairs(&batch), vec![(1, 2)]);
    }

    #[test]
    fn distant_entities_produce_no_pairs() {
        let (grid, table) = setup(vec![
            snapshot(1, 0.0, 0.0, Role::Object, false),
            snapshot(2, 500.0, 500.0, Role::Object, false),
        ]);
        let mut checked = HashSet::new();
        let batch = generate_pairs(&grid, &table, PairMode::All, &mut checked);
        assert!(batch.pairs.is_empty());
    }

    #[test]
    fn asleep_asleep_skipped_but_asleep_awake_kept() {
        let (grid, table) = setup(vec![
            snapshot(1, 5.0, 5.0, Role::Object, true),
            snapshot(2, 10.0, 5.0, Role::Object, true),
            snapshot(3, 15.0, 5.0, Role::Object, false),
        ]);
        let mut checked = HashSet::new();
        let batch = generate_pairs(&grid, &table, PairMode::ObjectObject, &mut checked);
        // (1,2) skipped; (1,3) and (2,3) kept.
        assert_eq!(sorted_pairs(&batch), vec![(1, 3), (2, 3)]);
    }

    #[test]
    fn asleep_object_skips_obstacle_pairs() {
        let (grid, table) = setup(vec![
            snapshot(1, 5.0, 5.0, Role::Object, true),
            snapshot(2, 10.0, 5.0, Role::Object, false),
            snapshot(3, 15.0, 5.0, Role::Obstacle, false),
        ]);
        let mut checked = HashSet::new();
        let batch = generate_pairs(&grid, &table, PairMode::ObjectObstacle, &mut checked);
        assert_eq!(sorted_pairs(&batch), vec![(2, 3)]);
    }

    #[test]
    fn all_mode_emits_both_pairings_without_duplicates() {
        let (grid, table) = setup(vec![
            snapshot(1, 5.0, 5.0, Role::Object, false),
            snapshot(2, 10.0, 5.0, Role::Object, false),
            snapshot(3, 15.0, 5.0, Role::Obstacle, false),
        ]);
        let mut checked = HashSet::new();
        let batch = generate_pairs(&grid, &table, PairMode::All, &mut checked);
        assert_eq!(sorted_pairs(&batch), vec![(1, 2), (1, 3), (2, 3)]);

        let keys: HashSet<u64> = batch
            .pairs
            .iter()
            .map(|&(a, b)| crate::pair::pair_key(a, b))
            .collect();
        assert_eq!(keys.len(), batch.pairs.len());
    }
}
