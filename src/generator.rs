//! Generator plugins, the host registry contract, and the substitution layer.
//!
//! Substitution replaces an opted-in plugin with a delegating wrapper inside
//! the host's ordered generator collection. The wrapper forwards every call
//! to the original plugin and records task completion afterwards, which is
//! how both the normal generation path and the drain loop feed the ledgers.
//! Substitution is reversed at session end: the original plugin instances go
//! back into their slots and the wrappers are discarded.

use crate::ledger::SessionTable;
use crate::registry::MarkerRegistry;
use crate::types::{Marker, TaskId, TileCoord, WorldId};
use rand::RngCore;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Capability record a plugin returns when it opts into retrofitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrofitCapability {
    /// Whether retrofitting is currently enabled for this plugin.
    pub enabled: bool,
    /// Persisted-state marker its completions are grouped under.
    pub marker: Marker,
    /// Stable unique name; doubles as the retrofit task identifier.
    pub name: TaskId,
}

/// Host-provided access to the world a generator invocation runs against.
pub trait GenerationTarget {
    /// Identifier of the world being generated into.
    fn world(&self) -> WorldId;

    /// The world's base seed.
    fn seed(&self) -> i64;

    /// Host-specific tile access for generator implementations to downcast.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A terrain generator plugin of the managed kind.
pub trait TileGenerator: Send + Sync {
    /// Generate this plugin's content for `tile`.
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        tile: TileCoord,
        target: &mut dyn GenerationTarget,
    ) -> anyhow::Result<()>;

    /// Retrofit opt-in. Plugins that do not participate return `None`.
    fn retrofit(&self) -> Option<RetrofitCapability> {
        None
    }
}

/// One slot in the host's active-generator collection.
#[derive(Clone)]
pub struct GeneratorEntry {
    pub generator: Arc<dyn TileGenerator>,
    pub priority: i32,
}

/// The host's mutable ordered collection of active generator plugins.
///
/// Substitution replaces a slot's generator in place, so relative ordering
/// and the slot's priority value are preserved by construction.
#[derive(Default)]
pub struct GeneratorRegistry {
    entries: Vec<GeneratorEntry>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, generator: Arc<dyn TileGenerator>, priority: i32) {
        self.entries.push(GeneratorEntry {
            generator,
            priority,
        });
    }

    pub fn entries(&self) -> &[GeneratorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Delegating wrapper installed in place of an opted-in plugin.
///
/// Owns exactly one delegate and one task identifier, for the duration of a
/// session. Completion is recorded only after the delegate returns normally,
/// so a failed invocation leaves the task owed.
pub struct GeneratorWrapper {
    delegate: Arc<dyn TileGenerator>,
    task: TaskId,
    sessions: Arc<SessionTable>,
}

impl GeneratorWrapper {
    pub fn delegate(&self) -> &Arc<dyn TileGenerator> {
        &self.delegate
    }

    pub fn task(&self) -> &TaskId {
        &self.task
    }
}

impl TileGenerator for GeneratorWrapper {
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        tile: TileCoord,
        target: &mut dyn GenerationTarget,
    ) -> anyhow::Result<()> {
        debug!(task = %self.task, %tile, "passing generation through to underlying generator");
        self.delegate.generate(rng, tile, target)?;
        self.sessions
            .complete_retrogen(target.world(), tile, self.task.clone());
        Ok(())
    }
}

/// Replace every eligible, not-yet-substituted plugin with a delegating
/// wrapper and register its task under the marker it advertises.
///
/// Returns the number of plugins substituted. Encountering an
/// already-substituted name is a no-op, not an error.
pub(crate) fn substitute_generators(
    host: &mut GeneratorRegistry,
    markers: &mut MarkerRegistry,
    delegates: &mut HashMap<TaskId, Arc<GeneratorWrapper>>,
    sessions: &Arc<SessionTable>,
) -> usize {
    let mut substituted = 0;
    for entry in host.entries.iter_mut() {
        let Some(capability) = entry.generator.retrofit() else {
            continue;
        };
        if !capability.enabled || delegates.contains_key(&capability.name) {
            continue;
        }

        info!(name = %capability.name, marker = %capability.marker, "substituting generator with delegate");
        let wrapper = Arc::new(GeneratorWrapper {
            delegate: Arc::clone(&entry.generator),
            task: capability.name.clone(),
            sessions: Arc::clone(sessions),
        });
        entry.generator = wrapper.clone();
        delegates.insert(capability.name.clone(), wrapper);
        markers.register(capability.marker, capability.name);
        substituted += 1;
    }
    substituted
}

/// Put every substituted plugin back into its original slot and drop the
/// wrappers. Order and priority are untouched since replacement is in place.
pub(crate) fn restore_generators(
    host: &mut GeneratorRegistry,
    delegates: &mut HashMap<TaskId, Arc<GeneratorWrapper>>,
) {
    for wrapper in delegates.values() {
        let wrapper_ptr = Arc::as_ptr(wrapper) as *const ();
        for entry in host.entries.iter_mut() {
            if Arc::as_ptr(&entry.generator) as *const () == wrapper_ptr {
                entry.generator = Arc::clone(wrapper.delegate());
                break;
            }
        }
    }
    delegates.clear();
}
