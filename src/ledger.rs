//! Per-world pending and completed task ledgers.
//!
//! [`TaskLedger`] is an insertion-ordered multimap from tile coordinate to
//! task identifiers: keys iterate in first-insertion order, tasks within a
//! key in append order. The drain loop's "ledger iteration order" contract
//! and the throttle's defer-in-original-order behavior both rest on this.
//!
//! A [`WorldSession`] owns one pending ledger, one completed ledger and the
//! per-step execution counter; sessions live in the [`SessionTable`] keyed by
//! world id, created at world start and discarded at world stop.

use crate::types::{TaskId, TileCoord, WorldId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Insertion-ordered multimap from tile coordinate to task identifiers.
#[derive(Debug, Default)]
pub struct TaskLedger {
    tasks: HashMap<TileCoord, Vec<TaskId>>,
    order: Vec<TileCoord>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `task` under `tile`.
    pub fn push(&mut self, tile: TileCoord, task: TaskId) {
        if !self.tasks.contains_key(&tile) {
            self.order.push(tile);
        }
        self.tasks.entry(tile).or_default().push(task);
    }

    /// Remove one occurrence of `task` under `tile`. Returns whether an
    /// entry was removed.
    pub fn remove(&mut self, tile: TileCoord, task: &TaskId) -> bool {
        let Some(tasks) = self.tasks.get_mut(&tile) else {
            return false;
        };
        let Some(pos) = tasks.iter().position(|t| t == task) else {
            return false;
        };
        tasks.remove(pos);
        if tasks.is_empty() {
            self.tasks.remove(&tile);
            self.order.retain(|t| t != &tile);
        }
        true
    }

    /// Tasks recorded under `tile`, in append order.
    pub fn tasks_for(&self, tile: TileCoord) -> &[TaskId] {
        self.tasks.get(&tile).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All (tile, task) entries, key-major in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (TileCoord, &TaskId)> + '_ {
        self.order.iter().flat_map(move |tile| {
            self.tasks
                .get(tile)
                .into_iter()
                .flatten()
                .map(move |task| (*tile, task))
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Ledgers and guards scoped to one running world instance.
///
/// The pending and completed ledgers each sit behind their own mutex. Lock
/// acquisition is never nested: callers take one guard, finish with it, then
/// take the other.
#[derive(Debug, Default)]
pub struct WorldSession {
    pending: Mutex<TaskLedger>,
    completed: Mutex<TaskLedger>,
    executed_this_step: AtomicU32,
}

impl WorldSession {
    pub fn pending(&self) -> &Mutex<TaskLedger> {
        &self.pending
    }

    pub fn completed(&self) -> &Mutex<TaskLedger> {
        &self.completed
    }

    /// Reset the per-step counter on the step's leading edge.
    pub fn reset_step_counter(&self) {
        self.executed_this_step.store(0, Ordering::Relaxed);
    }

    /// Claim the next execution slot in this step, returning the slot index
    /// before the increment.
    pub fn next_step_slot(&self) -> u32 {
        self.executed_this_step.fetch_add(1, Ordering::Relaxed)
    }
}

/// Session registry keyed by world id.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<WorldId, Arc<WorldSession>>>,
}

impl SessionTable {
    /// Create (or fetch) the session for `world`.
    pub fn create(&self, world: WorldId) -> Arc<WorldSession> {
        self.sessions.lock().entry(world).or_default().clone()
    }

    pub fn get(&self, world: WorldId) -> Option<Arc<WorldSession>> {
        self.sessions.lock().get(&world).cloned()
    }

    /// Discard the session for `world`, dropping its ledgers.
    pub fn remove(&self, world: WorldId) -> Option<Arc<WorldSession>> {
        self.sessions.lock().remove(&world)
    }

    pub fn clear(&self) {
        self.sessions.lock().clear();
    }

    /// Queue `task` as pending for `tile`. No-op when the world has no
    /// session.
    pub fn queue_retrogen(&self, world: WorldId, tile: TileCoord, task: TaskId) {
        if let Some(session) = self.get(world) {
            session.pending.lock().push(tile, task);
        }
    }

    /// Record `task` as completed for `tile`, removing any pending entry for
    /// the same pair first. The pending guard is dropped before the completed
    /// guard is taken.
    pub fn complete_retrogen(&self, world: WorldId, tile: TileCoord, task: TaskId) {
        let Some(session) = self.get(world) else {
            return;
        };
        session.pending.lock().remove(tile, &task);
        session.completed.lock().push(tile, task);
    }
}
