//! Serialized tile state and the load/save persistence bridge.
//!
//! Completion history lives inside the host's own per-tile payload as one
//! sub-object per marker: `{ "<marker>": { "list": ["task", ...] } }`. The
//! bridge only ever appends to those lists; unrelated host keys pass through
//! untouched, and existing entries are never truncated.

use crate::generator::GeneratorWrapper;
use crate::ledger::SessionTable;
use crate::registry::MarkerRegistry;
use crate::types::{Marker, TaskId, TileCoord, WorldId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

const LIST_TAG: &str = "list";

/// A tile's serialized payload: a nested tagged structure owned by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileData {
    root: Map<String, Value>,
}

impl TileData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host-owned entries pass through this structure unmodified; these two
    /// accessors exist for hosts and tests to carry their own tags alongside
    /// the marker groups.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Task identifiers recorded under `marker`. An absent marker reads as
    /// an empty list; non-string entries are skipped.
    pub fn marker_list(&self, marker: &Marker) -> Vec<TaskId> {
        let Some(Value::Object(group)) = self.root.get(marker.as_str()) else {
            return Vec::new();
        };
        let Some(Value::Array(list)) = group.get(LIST_TAG) else {
            return Vec::new();
        };
        list.iter()
            .filter_map(Value::as_str)
            .map(TaskId::from)
            .collect()
    }

    /// Append `task` under `marker`, creating the marker group when absent.
    /// An already-recorded identifier is not appended twice.
    pub fn append_completion(&mut self, marker: &Marker, task: &TaskId) {
        let slot = self
            .root
            .entry(marker.as_str().to_string())
            .or_insert_with(|| json!({ LIST_TAG: [] }));
        if !slot.is_object() {
            *slot = json!({ LIST_TAG: [] });
        }
        if let Value::Object(group) = slot {
            let list = group
                .entry(LIST_TAG.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !list.is_array() {
                *list = Value::Array(Vec::new());
            }
            if let Value::Array(items) = list {
                if !items.iter().any(|v| v.as_str() == Some(task.as_str())) {
                    items.push(Value::String(task.as_str().to_string()));
                }
            }
        }
    }
}

/// Tile-load protocol: diff the persisted marker groups against the registry,
/// queue what is owed, and re-admit what already ran.
///
/// Only tasks whose identifier is currently substituted are queued. Every
/// identifier found in a persisted list goes back into the completed ledger
/// so that a no-op re-save reproduces the same persisted state.
pub(crate) fn absorb_tile_load(
    markers: &MarkerRegistry,
    sessions: &SessionTable,
    delegates: &HashMap<TaskId, Arc<GeneratorWrapper>>,
    world: WorldId,
    tile: TileCoord,
    data: &TileData,
) {
    let mut existing: HashSet<TaskId> = HashSet::new();
    for marker in markers.markers() {
        for task in data.marker_list(marker) {
            existing.insert(task);
        }
        for task in markers.tasks_for(marker) {
            if existing.contains(task) || !delegates.contains_key(task) {
                continue;
            }
            sessions.queue_retrogen(world, tile, task.clone());
        }
    }

    for task in existing {
        sessions.complete_retrogen(world, tile, task);
    }
}

/// Tile-save protocol: flush the tile's completed-ledger entries into `data`.
///
/// A completed identifier with no registered marker is stale (its generator
/// was removed from the active configuration); it is skipped with a
/// diagnostic rather than failing the save. Holding the completed guard for
/// the whole flush keeps the save mutually exclusive with in-step completion
/// recording.
pub(crate) fn flush_tile_save(
    markers: &MarkerRegistry,
    sessions: &SessionTable,
    world: WorldId,
    tile: TileCoord,
    data: &mut TileData,
) {
    let Some(session) = sessions.get(world) else {
        return;
    };
    let completed = session.completed().lock();
    let done = completed.tasks_for(tile);
    if done.is_empty() {
        return;
    }
    for task in done {
        match markers.marker_for(task) {
            Some(marker) => data.append_completion(marker, task),
            None => {
                debug!(
                    %task,
                    "completed task has no registered marker, skipping; it was probably removed from the active configuration"
                );
            }
        }
    }
}
