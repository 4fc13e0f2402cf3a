//! Persistence bridge behavior: owed-work computation, re-admission,
//! idempotent saves and the full execute/save/reload round trip.

use crate::integration::support::{scheduler_with_throttle, RecordingGenerator, TestWorld};
use retrogen::generator::GeneratorRegistry;
use retrogen::persistence::TileData;
use retrogen::types::{Marker, TaskId, TileCoord, WorldId};
use serde_json::json;

const WORLD: WorldId = WorldId(0);

fn single_generator_session() -> (retrogen::api::Retrogen, GeneratorRegistry) {
    let (generator, _) = RecordingGenerator::new("mod:ore", "railcraft");
    let mut host = GeneratorRegistry::new();
    host.push(generator, 0);

    let mut retro = scheduler_with_throttle(100);
    retro.session_start(&mut host);
    retro.world_started(WORLD);
    (retro, host)
}

#[test]
fn load_enqueues_owed_work() {
    let (retro, _host) = single_generator_session();

    retro.tile_loaded(WORLD, TileCoord::new(3, -5), &TileData::new());

    assert_eq!(retro.pending_count(WORLD), 1);
    assert_eq!(retro.completed_count(WORLD), 0);
}

#[test]
fn persisted_completion_is_not_reenqueued() {
    let (retro, _host) = single_generator_session();

    let mut data = TileData::new();
    data.append_completion(&Marker::from("railcraft"), &TaskId::from("mod:ore"));
    retro.tile_loaded(WORLD, TileCoord::new(3, -5), &data);

    assert_eq!(retro.pending_count(WORLD), 0);
    // the recorded completion is re-admitted so the next save preserves it
    assert_eq!(retro.completed_count(WORLD), 1);
}

#[test]
fn save_with_no_completed_work_leaves_data_untouched() {
    let (retro, _host) = single_generator_session();

    let tile = TileCoord::new(3, -5);
    retro.tile_loaded(WORLD, tile, &TileData::new());

    let mut data = TileData::new();
    data.insert("terrain", json!({ "height": 64 }));
    let before = data.clone();

    retro.tile_saved(WORLD, tile, &mut data);
    assert_eq!(data, before);

    // a world without a session is just as inert
    retro.tile_saved(WorldId(9), tile, &mut data);
    assert_eq!(data, before);
}

#[test]
fn round_trip_records_each_task_exactly_once() {
    let tile = TileCoord::new(3, -5);
    let marker = Marker::from("railcraft");
    let task = TaskId::from("mod:ore");
    let mut data = TileData::new();

    // first session: discover owed work, execute it, save it
    {
        let (retro, _host) = single_generator_session();
        retro.tile_loaded(WORLD, tile, &data);
        assert_eq!(retro.pending_count(WORLD), 1);

        let mut ctx = TestWorld::new(WORLD, 42);
        retro.step_started(WORLD);
        let outcome = retro.step_ended(&mut ctx).unwrap();
        assert_eq!(outcome.executed, 1);

        retro.tile_saved(WORLD, tile, &mut data);
        assert_eq!(data.marker_list(&marker), vec![task.clone()]);
    }

    // fresh session with the same registry: nothing is owed any more
    {
        let (retro, _host) = single_generator_session();
        retro.tile_loaded(WORLD, tile, &data);
        assert_eq!(retro.pending_count(WORLD), 0);

        retro.tile_saved(WORLD, tile, &mut data);
        assert_eq!(data.marker_list(&marker), vec![task]);
    }
}

#[test]
fn repeated_saves_do_not_duplicate_entries() {
    let (retro, _host) = single_generator_session();
    let tile = TileCoord::new(0, 0);

    retro.tile_loaded(WORLD, tile, &TileData::new());
    let mut ctx = TestWorld::new(WORLD, 42);
    retro.step_started(WORLD);
    retro.step_ended(&mut ctx).unwrap();

    let mut data = TileData::new();
    retro.tile_saved(WORLD, tile, &mut data);
    retro.tile_saved(WORLD, tile, &mut data);

    assert_eq!(
        data.marker_list(&Marker::from("railcraft")),
        vec![TaskId::from("mod:ore")]
    );
}

#[test]
fn stale_identifier_is_skipped_on_save() {
    let (retro, _host) = single_generator_session();
    let tile = TileCoord::new(3, -5);
    let marker = Marker::from("railcraft");

    // a completion recorded by a generator that has since been removed from
    // the active configuration
    let mut data = TileData::new();
    data.append_completion(&marker, &TaskId::from("mod:legacy"));
    retro.tile_loaded(WORLD, tile, &data);
    assert_eq!(retro.completed_count(WORLD), 1);

    retro.tile_saved(WORLD, tile, &mut data);

    // the stale id is neither dropped from the persisted list nor re-written
    assert_eq!(data.marker_list(&marker), vec![TaskId::from("mod:legacy")]);
}

#[test]
fn only_substituted_tasks_are_enqueued() {
    let (generator, _) = RecordingGenerator::new("mod:ore", "railcraft");
    let (disabled, _) = RecordingGenerator::with_enabled("mod:off", "railcraft", false);
    let mut host = GeneratorRegistry::new();
    host.push(generator, 0);
    host.push(disabled, 1);

    let mut retro = scheduler_with_throttle(100);
    retro.session_start(&mut host);
    retro.world_started(WORLD);

    retro.tile_loaded(WORLD, TileCoord::new(0, 0), &TileData::new());

    // only the substituted generator's task is owed
    assert_eq!(retro.pending_count(WORLD), 1);
}
