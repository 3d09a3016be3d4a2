//! Parallel narrow-phase executor
//!
//! A fixed pool of stateless worker threads runs the geometry kernel over
//! batches of candidate pairs. Every task carries the full snapshot
//! bundle it needs, so results are reproducible regardless of which
//! worker handles which task. Results are routed back to the dispatcher
//! by task sequence number; late or unknown results are discarded.
//!
//! When the pool is empty (zero configured workers, or every spawn
//! failed) or a tick's pair count is below the dispatch threshold, the
//! exact same detection code path runs synchronously in the caller's
//! context. This fallback is mandatory: both modes call
//! [`narrow_phase::detect`], so contacts are identical either way.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::entity::{EntitySnapshot, SnapshotTable};
use crate::physics::contact::{ContactEvent, PairMode};
use crate::physics::narrow_phase;

/// Tasks queued ahead of the pool before dispatch blocks.
const TASK_QUEUE_CAPACITY: usize = 128;

/// Unit of dispatchable narrow-phase work.
///
/// The schema (together with [`TaskResult`]) is the dispatcher/worker
/// message contract and must stay structurally stable if workers are ever
/// moved across a process boundary; both types are serde round-trippable
/// for that reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionTask {
    /// Dispatcher-assigned sequence number used to route the result.
    pub seq: u64,
    /// Snapshots of every entity referenced by `pairs`, and nothing else.
    pub snapshots: Vec<EntitySnapshot>,
    /// Candidate pairs by numeric id.
    pub pairs: Vec<(u32, u32)>,
    /// Role pairing to test.
    pub mode: PairMode,
}

/// Worker reply tagged with the originating task's sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Sequence number of the task that produced these events.
    pub seq: u64,
    /// Contacts detected by the worker.
    pub events: Vec<ContactEvent>,
}

struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(
        id: usize,
        task_rx: Arc<Mutex<Receiver<CollisionTask>>>,
        result_tx: Sender<TaskResult>,
    ) -> std::io::Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("narrow-phase-{id}"))
            .spawn(move || loop {
                let task = {
                    let Ok(receiver) = task_rx.lock() else { break };
                    match receiver.recv() {
                        Ok(task) => task,
                        Err(_) => break,
                    }
                };
                let table = SnapshotTable::from_snapshots(task.snapshots);
                let events = narrow_phase::detect(&table, &task.pairs, task.mode);
                if result_tx.send(TaskResult { seq: task.seq, events }).is_err() {
                    break;
                }
            })?;
        Ok(Self { id, thread })
    }
}

/// Dispatcher plus worker pool for the narrow phase.
pub struct NarrowPhaseExecutor {
    workers: Vec<Worker>,
    task_tx: Sender<CollisionTask>,
    task_rx: Arc<Mutex<Receiver<CollisionTask>>>,
    result_tx: Sender<TaskResult>,
    result_rx: Receiver<TaskResult>,
    next_seq: u64,
    batch_threshold: usize,
    timeout: Duration,
}

impl NarrowPhaseExecutor {
    /// Create an executor with up to `worker_count` worker threads.
    ///
    /// Spawn failures are logged and tolerated; with zero live workers
    /// every task runs synchronously (fail-open construction).
    pub fn new(worker_count: usize, batch_threshold: usize, timeout: Duration) -> Self {
        let (task_tx, task_rx) = bounded(TASK_QUEUE_CAPACITY);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, result_rx) = unbounded();

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            match Worker::spawn(id, Arc::clone(&task_rx), result_tx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(err) => warn!("failed to spawn narrow-phase worker {id}: {err}"),
            }
        }
        debug!("narrow-phase pool started with {} worker(s)", workers.len());

        Self {
            workers,
            task_tx,
            task_rx,
            result_tx,
            result_rx,
            next_seq: 0,
            batch_threshold,
            timeout,
        }
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wrap a snapshot bundle and pair list into a sequenced task.
    pub fn next_task(
        &mut self,
        snapshots: Vec<EntitySnapshot>,
        pairs: Vec<(u32, u32)>,
        mode: PairMode,
    ) -> CollisionTask {
        let seq = self.next_seq;
        self.next_seq += 1;
        CollisionTask { seq, snapshots, pairs, mode }
    }

    /// Run a single task to completion.
    pub fn execute(&mut self, task: CollisionTask) -> Vec<ContactEvent> {
        self.run_batches(vec![task])
    }

    /// Fan a tick's tasks out to the pool and merge their results.
    ///
    /// Tasks still outstanding when the timeout window closes contribute
    /// no contacts this tick (fail-open); their results, if they ever
    /// arrive, are discarded by the unknown-sequence check on a later
    /// tick. Small ticks skip the pool entirely.
    pub fn run_batches(&mut self, tasks: Vec<CollisionTask>) -> Vec<ContactEvent> {
        let total_pairs: usize = tasks.iter().map(|t| t.pairs.len()).sum();
        if self.workers.is_empty() || total_pairs < self.batch_threshold {
            return tasks.iter().map(run_task_inline).reduce(merge).unwrap_or_default();
        }

        self.respawn_crashed_workers();
        self.drain_stale_results();

        let mut pending: HashSet<u64> = HashSet::with_capacity(tasks.len());
        let mut events = Vec::new();
        for task in tasks {
            let seq = task.seq;
            match self.task_tx.try_send(task) {
                Ok(()) => {
                    pending.insert(seq);
                }
                Err(err) => {
                    // Queue full or pool gone: run this batch inline.
                    events.extend(run_task_inline(&err.into_inner()));
                }
            }
        }

        events.extend(self.collect_results(&mut pending));
        events
    }

    /// Wait (bounded) for the pending sequence numbers and merge whatever
    /// arrives in time.
    fn collect_results(&mut self, pending: &mut HashSet<u64>) -> Vec<ContactEvent> {
        let deadline = Instant::now() + self.timeout;
        let mut events = Vec::new();

        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.result_rx.recv_timeout(remaining) {
                Ok(result) => {
                    if pending.remove(&result.seq) {
                        events.extend(result.events);
                    } else {
                        trace!("discarding unmatched result for task {}", result.seq);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "narrow-phase timeout after {:?}: {} task(s) dropped this tick",
                        self.timeout,
                        pending.len()
                    );
                    pending.clear();
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("narrow-phase result channel closed; {} task(s) lost", pending.len());
                    pending.clear();
                    break;
                }
            }
        }

        events
    }

    /// Replace workers whose threads have exited. Routing for other
    /// workers' in-flight tasks is unaffected since all channels are
    /// shared.
    fn respawn_crashed_workers(&mut self) {
        for worker in &mut self.workers {
            if worker.thread.is_finished() {
                warn!("narrow-phase worker {} exited; respawning", worker.id);
                match Worker::spawn(worker.id, Arc::clone(&self.task_rx), self.result_tx.clone()) {
                    Ok(replacement) => *worker = replacement,
                    Err(err) => warn!("failed to respawn worker {}: {err}", worker.id),
                }
            }
        }
    }

    /// Throw away results from tasks that timed out on earlier ticks.
    fn drain_stale_results(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            trace!("discarding late result for task {}", result.seq);
        }
    }
}

fn run_task_inline(task: &CollisionTask) -> Vec<ContactEvent> {
    let table = SnapshotTable::from_snapshots(task.snapshots.clone());
    narrow_phase::detect(&table, &task.pairs, task.mode)
}

fn merge(mut a: Vec<ContactEvent>, b: Vec<ContactEvent>) -> Vec<ContactEvent> {
    a.extend(b);
    a
}
