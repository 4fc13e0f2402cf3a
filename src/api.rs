//! Retrofit scheduler facade.
//!
//! [`Retrogen`] owns the marker registry, the substituted-delegate table and
//! the per-world sessions, and exposes the host lifecycle hooks: session
//! start/stop, world start/stop, step leading/trailing edges, and tile
//! load/save. All state is scoped to this object; nothing ambient.

use crate::config::RetrogenConfig;
use crate::error::RetrogenError;
use crate::generator::{
    restore_generators, substitute_generators, GeneratorRegistry, GeneratorWrapper,
};
use crate::ledger::SessionTable;
use crate::persistence::{absorb_tile_load, flush_tile_save, TileData};
use crate::registry::MarkerRegistry;
use crate::scheduler::{drain_step, StepContext, StepOutcome};
use crate::types::{TaskId, TileCoord, WorldId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct Retrogen {
    config: RetrogenConfig,
    markers: MarkerRegistry,
    delegates: HashMap<TaskId, Arc<GeneratorWrapper>>,
    sessions: Arc<SessionTable>,
}

impl Retrogen {
    /// Build a scheduler from an already-loaded configuration.
    pub fn new(config: RetrogenConfig) -> Result<Self, RetrogenError> {
        config.validate()?;
        Ok(Self {
            config,
            markers: MarkerRegistry::new(),
            delegates: HashMap::new(),
            sessions: Arc::new(SessionTable::default()),
        })
    }

    /// Build a scheduler, loading the config file and creating it with
    /// defaults when absent.
    pub fn from_config_file(path: &Path) -> Result<Self, RetrogenError> {
        let config = RetrogenConfig::load_or_create(path)?;
        Self::new(config)
    }

    pub fn config(&self) -> &RetrogenConfig {
        &self.config
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    /// Whether `task`'s generator is currently substituted.
    pub fn is_substituted(&self, task: &TaskId) -> bool {
        self.delegates.contains_key(task)
    }

    /// Session start: rebuild the marker registry and substitute every
    /// eligible plugin in the host's registry. Returns how many plugins were
    /// substituted; already-substituted plugins are skipped.
    pub fn session_start(&mut self, host: &mut GeneratorRegistry) -> usize {
        self.sessions.clear();
        self.markers.clear();
        let substituted =
            substitute_generators(host, &mut self.markers, &mut self.delegates, &self.sessions);
        // Wrappers carried over from a session that never stopped still need
        // their marker registrations after the clear above.
        for (task, wrapper) in &self.delegates {
            if let Some(capability) = wrapper.delegate().retrofit() {
                self.markers.register(capability.marker, task.clone());
            }
        }
        substituted
    }

    /// Session end: restore the original plugins into their slots and
    /// discard every in-memory ledger. Nothing survives but what tile saves
    /// already wrote into persisted state.
    pub fn session_stop(&mut self, host: &mut GeneratorRegistry) {
        restore_generators(host, &mut self.delegates);
        self.sessions.clear();
    }

    /// Create the ledgers and guards for `world`.
    pub fn world_started(&self, world: WorldId) {
        self.sessions.create(world);
    }

    /// Discard `world`'s ledgers and guards.
    pub fn world_stopped(&self, world: WorldId) {
        self.sessions.remove(world);
    }

    /// Leading edge of a simulation step: reset the per-step counter.
    pub fn step_started(&self, world: WorldId) {
        if let Some(session) = self.sessions.get(world) {
            session.reset_step_counter();
        }
    }

    /// Trailing edge of a simulation step: drain up to `max_per_tick`
    /// pending tasks for the context's world. A world without a session
    /// drains nothing.
    pub fn step_ended(&self, ctx: &mut dyn StepContext) -> Result<StepOutcome, RetrogenError> {
        let Some(session) = self.sessions.get(ctx.world()) else {
            return Ok(StepOutcome::default());
        };
        drain_step(ctx, &session, &self.delegates, self.config.max_per_tick)
    }

    /// Tile load: enqueue owed work and re-admit recorded completions.
    pub fn tile_loaded(&self, world: WorldId, tile: TileCoord, data: &TileData) {
        absorb_tile_load(
            &self.markers,
            &self.sessions,
            &self.delegates,
            world,
            tile,
            data,
        );
    }

    /// Tile save: flush this tile's completed entries into `data`. A tile
    /// with no completed entries leaves `data` untouched.
    pub fn tile_saved(&self, world: WorldId, tile: TileCoord, data: &mut TileData) {
        flush_tile_save(&self.markers, &self.sessions, world, tile, data);
    }

    /// Pending entries currently queued for `world`.
    pub fn pending_count(&self, world: WorldId) -> usize {
        self.sessions
            .get(world)
            .map(|s| s.pending().lock().len())
            .unwrap_or(0)
    }

    /// Completed entries recorded for `world` this session.
    pub fn completed_count(&self, world: WorldId) -> usize {
        self.sessions
            .get(world)
            .map(|s| s.completed().lock().len())
            .unwrap_or(0)
    }
}
