//! End-to-end runs of the synthetic population against an aggregator

mod common;

use glitchfield::collab::SideEffect;
use glitchfield::{
    AggregatorConfig, Environment, GlitchAggregator, GlitchEvent, RecordingSink,
    SyntheticPopulation,
};

fn run(seed: u64, steps: usize) -> (GlitchAggregator, Vec<GlitchEvent>) {
    let sink = RecordingSink::new();
    let mut population = SyntheticPopulation::new(5, Some(seed));
    let mut aggregator = GlitchAggregator::new(AggregatorConfig::default().with_seed(seed))
        .unwrap()
        .with_registry(population.registry())
        .with_sink(sink.clone());

    population.set_environment(&mut aggregator, Environment::Abstract);
    for _ in 0..steps {
        population.step(&mut aggregator, 16.0);
    }
    (aggregator, sink.events())
}

#[test]
fn same_seed_reproduces_the_run() {
    let (first, first_events) = run(common::SEED, 1_500);
    let (second, second_events) = run(common::SEED, 1_500);

    let ids = |a: &GlitchAggregator| {
        a.history()
            .iter()
            .map(|r| (r.entity.id.clone(), r.entity.category, r.ended_ms))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.graph_snapshot(), second.graph_snapshot());
    assert_eq!(first_events, second_events);
}

#[test]
fn different_seeds_diverge() {
    let (first, _) = run(1, 1_500);
    let (second, _) = run(2, 1_500);
    let agents = |seed| {
        SyntheticPopulation::new(5, Some(seed))
            .agents()
            .iter()
            .map(|a| a.curiosity)
            .collect::<Vec<_>>()
    };
    assert_ne!(agents(1), agents(2));
    assert_eq!(first.elapsed_ms(), second.elapsed_ms());
}

#[test]
fn long_run_keeps_invariants() {
    let (aggregator, events) = run(99, 4_000);

    assert!(aggregator.node_count() <= aggregator.config().max_nodes);
    assert!((0.5..=2.0).contains(&aggregator.global_intensity()));
    for entity in aggregator.active_entities() {
        assert!(entity.intensity <= 1.5);
        assert!(entity.radius >= 0.0);
    }

    // every side effect references an entity that existed at some point
    let known: std::collections::HashSet<_> =
        aggregator.history().iter().map(|r| r.entity.id.clone()).collect();
    for event in &events {
        if let GlitchEvent::SideEffect(effect) = event {
            let id = match effect {
                SideEffect::TemporalDistortion { entity, .. }
                | SideEffect::RealityBlur { entity, .. }
                | SideEffect::MemoryFragment { entity, .. }
                | SideEffect::DreamManifestation { entity, .. } => entity,
            };
            assert!(known.contains(id));
        }
    }
}

#[test]
fn events_serialize_to_json() {
    let (_, events) = run(7, 600);
    for event in events.iter().take(200) {
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
