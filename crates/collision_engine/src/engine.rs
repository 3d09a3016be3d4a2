//! Engine orchestration
//!
//! Owns the spatial grid, the narrow-phase executor and the per-tick
//! bookkeeping, and wires the pipeline together: incremental grid sync
//! from entity snapshots, broad-phase pair generation, sharded dispatch,
//! result merge, and collision response.
//!
//! The engine is driven by a single-threaded tick loop. Grid mutation
//! only ever happens on the caller's thread, which is what guarantees
//! tick-ordered (last write wins) index updates.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::trace;

use crate::config::EngineConfig;
use crate::entity::{EntityId, EntitySnapshot, EntityStore, GameplayHooks, Role, SnapshotTable};
use crate::error::EngineResult;
use crate::executor::{CollisionTask, NarrowPhaseExecutor};
use crate::foundation::math::Point2;
use crate::physics::contact::{ContactEvent, PairMode};
use crate::physics::{broad_phase, response};
use crate::spatial::UniformGrid;

/// The collision engine: spatial index, pair generation, parallel narrow
/// phase and response, behind one per-tick entry point.
pub struct CollisionEngine {
    config: EngineConfig,
    grid: UniformGrid,
    executor: NarrowPhaseExecutor,
    table: SnapshotTable,
    /// Position at which each entity was last indexed into the grid;
    /// sub-epsilon motion accumulates against this rather than being
    /// lost tick over tick.
    indexed: HashMap<u32, Point2>,
    /// Tick-scoped pair dedup, cleared at the start of every detect pass.
    checked: HashSet<u64>,
}

impl CollisionEngine {
    /// Create an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let executor = NarrowPhaseExecutor::new(
            config.worker_threads,
            config.batch_threshold,
            Duration::from_millis(config.task_timeout_ms),
        );
        Ok(Self {
            grid: UniformGrid::new(config.cell_size),
            executor,
            table: SnapshotTable::default(),
            indexed: HashMap::new(),
            checked: HashSet::new(),
            config,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of entities currently indexed.
    pub fn entity_count(&self) -> usize {
        self.grid.len()
    }

    /// Refresh the snapshot table and incrementally maintain the grid:
    /// new ids are inserted, moved ids re-bucketed (only when they moved
    /// more than the position epsilon), retired ids removed.
    pub fn sync(&mut self, store: &dyn EntityStore) {
        let snapshots = store.snapshots();
        let epsilon_sq = self.config.position_epsilon * self.config.position_epsilon;

        let mut seen: HashSet<u32> = HashSet::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            seen.insert(snapshot.numeric_id);
            let previous_role = self.table.get(snapshot.numeric_id).map(|s| s.role);
            match self.indexed.get(&snapshot.numeric_id).copied() {
                None => {
                    self.grid.insert(snapshot.numeric_id, &snapshot.position, snapshot.role);
                    self.indexed.insert(snapshot.numeric_id, snapshot.position);
                }
                Some(indexed_at) => {
                    if previous_role != Some(snapshot.role) {
                        // Role change (or numeric id reuse): full re-insert.
                        self.grid.insert(snapshot.numeric_id, &snapshot.position, snapshot.role);
                        self.indexed.insert(snapshot.numeric_id, snapshot.position);
                    } else if (snapshot.position - indexed_at).norm_squared() > epsilon_sq {
                        self.grid.update_position(snapshot.numeric_id, &snapshot.position);
                        self.indexed.insert(snapshot.numeric_id, snapshot.position);
                    }
                }
            }
        }

        let retired: Vec<u32> = self
            .indexed
            .keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        for id in retired {
            self.grid.remove(id);
            self.indexed.remove(&id);
        }

        self.table = SnapshotTable::from_snapshots(snapshots);
    }

    /// Rebuild the index from scratch. Recovery path after a world reset;
    /// normal ticks use [`CollisionEngine::sync`].
    pub fn reset(&mut self, store: &dyn EntityStore) {
        let snapshots = store.snapshots();
        self.grid.rebuild(&snapshots);
        self.indexed = snapshots.iter().map(|s| (s.numeric_id, s.position)).collect();
        self.table = SnapshotTable::from_snapshots(snapshots);
    }

    /// Run broad and narrow phase for the current tick's snapshots.
    ///
    /// Candidate pairs are deduplicated once, single-threaded, then
    /// sharded into fixed-size tasks with minimal snapshot bundles and
    /// dispatched to the executor. Contacts come back unordered.
    pub fn detect(&mut self, mode: PairMode) -> Vec<ContactEvent> {
        self.checked.clear();
        let batch = broad_phase::generate_pairs(&self.grid, &self.table, mode, &mut self.checked);
        if batch.pairs.is_empty() {
            return Vec::new();
        }
        trace!(
            "broad phase: {} candidate pair(s), {} referenced entit(ies)",
            batch.pairs.len(),
            batch.referenced.len()
        );

        let tasks: Vec<CollisionTask> = batch
            .pairs
            .chunks(self.config.batch_size)
            .map(|chunk| {
                let mut ids: HashSet<u32> = HashSet::new();
                for &(a, b) in chunk {
                    ids.insert(a);
                    ids.insert(b);
                }
                let bundle: Vec<EntitySnapshot> = ids
                    .into_iter()
                    .filter_map(|id| self.table.get(id).cloned())
                    .collect();
                self.executor.next_task(bundle, chunk.to_vec(), mode)
            })
            .collect();

        self.executor.run_batches(tasks)
    }

    /// Apply one tick's contacts via the response rules and gameplay
    /// hooks.
    pub fn respond(&self, events: &[ContactEvent], store: &dyn EntityStore, hooks: &mut dyn GameplayHooks) {
        response::apply(events, &self.table, store, hooks, &self.config);
    }

    /// Composed per-tick entry point: sync, detect with the configured
    /// pair mode, respond. Returns the tick's contacts.
    pub fn tick(&mut self, store: &dyn EntityStore, hooks: &mut dyn GameplayHooks) -> Vec<ContactEvent> {
        self.sync(store);
        let events = self.detect(self.config.pair_mode);
        self.respond(&events, store, hooks);
        events
    }

    /// Entities whose grid cells intersect `point ± radius`, exactly
    /// filtered by role (unlike the raw grid query, which
    /// over-approximates pickups and objects into one set).
    pub fn query_nearby(&self, point: &Point2, radius: f64, role: Option<Role>) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .grid
            .query_nearby(point, radius, role)
            .into_iter()
            .filter_map(|numeric_id| self.table.get(numeric_id))
            .filter(|snapshot| role.is_none_or(|r| snapshot.role == r))
            .map(|snapshot| snapshot.id.clone())
            .collect();
        ids.sort();
        ids
    }
}
