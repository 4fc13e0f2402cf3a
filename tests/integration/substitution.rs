//! Substitution and restore behavior of the generator wrapper layer.

use crate::integration::support::{
    same_instance, scheduler_with_throttle, FailingGenerator, PlainGenerator, RecordingGenerator,
    TestTarget, TestWorld,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use retrogen::generator::{GeneratorRegistry, TileGenerator};
use retrogen::scheduler::StepContext;
use retrogen::types::{Marker, TaskId, TileCoord, WorldId};
use std::sync::Arc;

#[test]
fn substitutes_every_eligible_plugin() {
    let plain = Arc::new(PlainGenerator);
    let (gen_a, _) = RecordingGenerator::new("mod:ore_a", "railcraft");
    let (gen_b, _) = RecordingGenerator::new("mod:ore_b", "quarry");
    let (disabled, _) = RecordingGenerator::with_enabled("mod:off", "off", false);

    let mut host = GeneratorRegistry::new();
    host.push(plain.clone(), 0);
    host.push(gen_a.clone(), 10);
    host.push(gen_b.clone(), 5);
    host.push(disabled.clone(), 1);

    let mut retro = scheduler_with_throttle(100);
    assert_eq!(retro.session_start(&mut host), 2);

    let entries = host.entries();
    assert_eq!(entries.len(), 4);

    // non-participants keep their instances; opted-in slots hold wrappers
    assert!(same_instance(&entries[0].generator, &plain));
    assert!(!same_instance(&entries[1].generator, &gen_a));
    assert!(!same_instance(&entries[2].generator, &gen_b));
    assert!(same_instance(&entries[3].generator, &disabled));

    // priorities stay with their slots
    let priorities: Vec<i32> = entries.iter().map(|e| e.priority).collect();
    assert_eq!(priorities, vec![0, 10, 5, 1]);

    assert!(retro.is_substituted(&TaskId::from("mod:ore_a")));
    assert!(retro.is_substituted(&TaskId::from("mod:ore_b")));
    assert!(!retro.is_substituted(&TaskId::from("mod:off")));
    assert_eq!(
        retro.markers().marker_for(&TaskId::from("mod:ore_a")),
        Some(&Marker::from("railcraft"))
    );
    assert_eq!(
        retro.markers().marker_for(&TaskId::from("mod:ore_b")),
        Some(&Marker::from("quarry"))
    );
}

#[test]
fn repeated_session_start_is_a_noop() {
    let (gen_a, _) = RecordingGenerator::new("mod:ore", "railcraft");
    let mut host = GeneratorRegistry::new();
    host.push(gen_a, 0);

    let mut retro = scheduler_with_throttle(100);
    assert_eq!(retro.session_start(&mut host), 1);
    let wrapped_ptr = Arc::as_ptr(&host.entries()[0].generator) as *const ();

    assert_eq!(retro.session_start(&mut host), 0);
    assert_eq!(
        Arc::as_ptr(&host.entries()[0].generator) as *const (),
        wrapped_ptr
    );
    // marker registrations survive the rebuild
    assert_eq!(
        retro.markers().marker_for(&TaskId::from("mod:ore")),
        Some(&Marker::from("railcraft"))
    );
}

#[test]
fn session_stop_restores_originals() {
    let plain = Arc::new(PlainGenerator);
    let (gen_a, _) = RecordingGenerator::new("mod:ore_a", "railcraft");
    let (gen_b, _) = RecordingGenerator::new("mod:ore_b", "quarry");

    let mut host = GeneratorRegistry::new();
    host.push(gen_a.clone(), 7);
    host.push(plain.clone(), 3);
    host.push(gen_b.clone(), -2);

    let mut retro = scheduler_with_throttle(100);
    retro.session_start(&mut host);
    retro.session_stop(&mut host);

    let entries = host.entries();
    assert!(same_instance(&entries[0].generator, &gen_a));
    assert!(same_instance(&entries[1].generator, &plain));
    assert!(same_instance(&entries[2].generator, &gen_b));
    let priorities: Vec<i32> = entries.iter().map(|e| e.priority).collect();
    assert_eq!(priorities, vec![7, 3, -2]);

    assert!(!retro.is_substituted(&TaskId::from("mod:ore_a")));
    assert!(!retro.is_substituted(&TaskId::from("mod:ore_b")));
}

#[test]
fn wrapper_forwards_and_records_completion() {
    let (gen_a, calls) = RecordingGenerator::new("mod:ore", "railcraft");
    let mut host = GeneratorRegistry::new();
    host.push(gen_a, 0);

    let mut retro = scheduler_with_throttle(100);
    retro.session_start(&mut host);

    let world = WorldId(0);
    retro.world_started(world);

    // invoke the wrapper exactly as the host's normal generation path would
    let wrapper = host.entries()[0].generator.clone();
    let mut ctx = TestWorld::new(world, 42);
    let target = ctx.generation_target().unwrap();
    let tile = TileCoord::new(3, -5);
    let mut rng = StdRng::seed_from_u64(0);
    wrapper.generate(&mut rng, tile, target).unwrap();

    assert_eq!(calls.lock().as_slice(), &[tile]);
    assert_eq!(retro.completed_count(world), 1);
    assert_eq!(retro.pending_count(world), 0);
}

#[test]
fn wrapper_does_not_record_on_failure() {
    let failing = FailingGenerator::new("mod:bad", "railcraft");
    let mut host = GeneratorRegistry::new();
    host.push(failing, 0);

    let mut retro = scheduler_with_throttle(100);
    retro.session_start(&mut host);

    let world = WorldId(0);
    retro.world_started(world);

    let wrapper = host.entries()[0].generator.clone();
    let mut target = TestTarget::new(world, 42);
    let mut rng = StdRng::seed_from_u64(0);
    let result = wrapper.generate(&mut rng, TileCoord::new(0, 0), &mut target);

    assert!(result.is_err());
    assert_eq!(retro.completed_count(world), 0);
}
