//! Marker Registry
//!
//! Maps a persisted-state marker to the set of task identifiers that report
//! completion under it, and each task identifier back to its owning marker.
//! Rebuilt from the discovered generator plugins at every session start;
//! there is no per-session removal.

use crate::types::{Marker, TaskId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    tasks_by_marker: HashMap<Marker, Vec<TaskId>>,
    marker_order: Vec<Marker>,
    marker_by_task: HashMap<TaskId, Marker>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` under `marker`. Idempotent; both directions of the
    /// mapping are kept consistent, including when a task moves to a new
    /// marker between sessions.
    pub fn register(&mut self, marker: Marker, task: TaskId) {
        if let Some(previous) = self.marker_by_task.get(&task) {
            if *previous == marker {
                return;
            }
            let previous = previous.clone();
            if let Some(tasks) = self.tasks_by_marker.get_mut(&previous) {
                tasks.retain(|t| t != &task);
            }
        }

        if !self.tasks_by_marker.contains_key(&marker) {
            self.marker_order.push(marker.clone());
        }
        let tasks = self.tasks_by_marker.entry(marker.clone()).or_default();
        if !tasks.contains(&task) {
            tasks.push(task.clone());
        }
        self.marker_by_task.insert(task, marker);
    }

    /// Task identifiers registered under `marker`, in registration order.
    pub fn tasks_for(&self, marker: &Marker) -> &[TaskId] {
        self.tasks_by_marker
            .get(marker)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The marker `task` reports completion under, if any.
    pub fn marker_for(&self, task: &TaskId) -> Option<&Marker> {
        self.marker_by_task.get(task)
    }

    /// All known markers, in first-registration order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.marker_order.iter()
    }

    pub fn task_count(&self) -> usize {
        self.marker_by_task.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marker_by_task.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks_by_marker.clear();
        self.marker_order.clear();
        self.marker_by_task.clear();
    }
}
