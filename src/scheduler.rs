//! Tick-bounded drain loop and deterministic tile seeding.
//!
//! The drain runs on the trailing edge of a simulation step and executes at
//! most `max_per_tick` pending tasks, in ledger iteration order; anything
//! beyond the bound stays queued, in its original order, for the next step.

use crate::error::RetrogenError;
use crate::generator::{GenerationTarget, GeneratorWrapper, TileGenerator};
use crate::ledger::WorldSession;
use crate::types::{TaskId, TileCoord, WorldId};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Step-local context the host supplies to the trailing-edge drain.
pub trait StepContext {
    /// Identifier of the world whose step is ending.
    fn world(&self) -> WorldId;

    /// The world's base seed.
    fn seed(&self) -> i64;

    /// Resolve the direct-invocation generation target from the world's
    /// provider. `None` means the step-local chunk generation context is
    /// unavailable, which is fatal for retrofit execution.
    fn generation_target(&mut self) -> Option<&mut dyn GenerationTarget>;
}

/// Summary of one trailing-edge drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Tasks executed this step.
    pub executed: u32,
    /// Pending entries left for later steps.
    pub remaining: usize,
}

/// Derive the tile-local deterministic seed for `tile` in a world seeded
/// with `world_seed`.
///
/// Pure function of its inputs: regeneration keyed off this seed is
/// reproducible independent of call order or wall-clock time.
pub fn tile_seed(world_seed: i64, tile: TileCoord) -> i64 {
    let mut rng = StdRng::seed_from_u64(world_seed as u64);
    let x_seed = (rng.next_u64() as i64) >> 3;
    let z_seed = (rng.next_u64() as i64) >> 3;
    (x_seed.wrapping_mul(tile.x as i64)).wrapping_add(z_seed.wrapping_mul(tile.z as i64))
        ^ world_seed
}

/// Drain up to `max_per_tick` pending entries for the context's world.
pub(crate) fn drain_step(
    ctx: &mut dyn StepContext,
    session: &Arc<WorldSession>,
    delegates: &HashMap<TaskId, Arc<GeneratorWrapper>>,
    max_per_tick: u32,
) -> Result<StepOutcome, RetrogenError> {
    let world = ctx.world();
    let world_seed = ctx.seed();

    let batch: Vec<(TileCoord, TaskId)> = {
        let pending = session.pending().lock();
        pending
            .entries()
            .take(max_per_tick as usize + 1)
            .map(|(tile, task)| (tile, task.clone()))
            .collect()
    };
    if batch.is_empty() {
        return Ok(StepOutcome::default());
    }

    let target = ctx
        .generation_target()
        .ok_or(RetrogenError::MissingGenerationTarget { world })?;

    let mut executed = 0u32;
    for (tile, task) in batch {
        let Some(wrapper) = delegates.get(&task) else {
            debug!(%task, %tile, "pending task has no substituted generator, dropping");
            session.pending().lock().remove(tile, &task);
            continue;
        };
        if session.next_step_slot() >= max_per_tick {
            let remaining = session.pending().lock().len();
            debug!(
                executed,
                remaining,
                %world,
                "completed retrogens for this step, deferring the rest"
            );
            return Ok(StepOutcome { executed, remaining });
        }
        run_retrogen(world_seed, tile, &task, wrapper, target)?;
        executed += 1;
    }

    let remaining = session.pending().lock().len();
    Ok(StepOutcome { executed, remaining })
}

/// Execute one retrofit task directly, off the normal generation path.
///
/// The invocation goes through the wrapper, whose completion recording moves
/// the task from the pending to the completed ledger; no bookkeeping is
/// duplicated here.
fn run_retrogen(
    world_seed: i64,
    tile: TileCoord,
    task: &TaskId,
    wrapper: &Arc<GeneratorWrapper>,
    target: &mut dyn GenerationTarget,
) -> Result<(), RetrogenError> {
    let mut rng = StdRng::seed_from_u64(tile_seed(world_seed, tile) as u64);
    wrapper
        .generate(&mut rng, tile, target)
        .map_err(|source| RetrogenError::TaskFailed {
            task: task.clone(),
            tile,
            source,
        })?;
    debug!(%task, %tile, "retrogenerated tile");
    Ok(())
}
