//! Behavioural properties of the glitch aggregator
//!
//! Each test drives the public API only and checks one observable rule:
//! node caps, decay monotonicity, removal bookkeeping, sync gates,
//! cluster emergence, interaction no-ops, notification radius, snapshot
//! purity and environment rescaling.

mod common;

use common::{
    aggregator_with, distort_all, notices, observed_aggregator, register_sources, seeded_aggregator,
    source,
};
use glitchfield::collab::{DreamState, Memory, SideEffect, SourceNotice};
use glitchfield::{
    AggregatorConfig, DreamDepth, DreamSymbol, EndReason, EntityId, EntityOrigin, GlitchCategory,
    GlitchEvent, InboundEvent, InteractionKind, InteractionOptions, NodeCategory, NodeKey,
    RecordingSink, SymbolKind, SyntheticPopulation, Vec2,
};
use std::collections::{HashMap, HashSet};

#[test]
fn node_count_never_exceeds_cap() {
    let config = AggregatorConfig {
        max_nodes: 4,
        ..Default::default()
    };
    let mut aggregator = aggregator_with(config);

    for i in 0..40 {
        let x = (i % 7) as f64 * 15.0;
        aggregator.record_distortion(source(&i.to_string()), Vec2::new(x, 0.0), NodeCategory::Spatial, 0.3);
        if i % 3 == 0 {
            aggregator.record_dream_state(source(&i.to_string()), Vec2::new(x, 5.0), 0.8, Default::default(), Vec::new());
        }
        aggregator.record_sync(&[source("a"), source(&i.to_string())], Vec2::new(x, 10.0), 0.5);
        assert!(aggregator.node_count() <= 4, "cap exceeded after event {}", i);
        aggregator.tick(16.0);
    }
}

#[test]
fn node_count_never_exceeds_cap_under_population_traffic() {
    let config = AggregatorConfig {
        max_nodes: 6,
        ..AggregatorConfig::default().with_seed(11)
    };
    let mut population = SyntheticPopulation::new(8, Some(11));
    let mut aggregator = aggregator_with(config).with_registry(population.registry());
    for _ in 0..1_000 {
        population.step(&mut aggregator, 16.0);
        assert!(aggregator.node_count() <= 6);
    }
}

#[test]
fn intensity_never_rises_between_ticks_unless_stabilized() {
    let mut population = SyntheticPopulation::new(6, Some(21));
    let mut aggregator = aggregator_with(AggregatorConfig::default().with_seed(21))
        .with_registry(population.registry());

    for _ in 0..1_500 {
        let before: HashMap<EntityId, f64> = aggregator
            .active_entities()
            .into_iter()
            .filter(|e| !e.is_stabilized())
            .map(|e| (e.id, e.intensity))
            .collect();
        population.step(&mut aggregator, 16.0);
        for entity in aggregator.active_entities() {
            if let Some(previous) = before.get(&entity.id) {
                assert!(
                    entity.intensity <= *previous + 1e-12,
                    "{} rose from {} to {}",
                    entity.id,
                    previous,
                    entity.intensity
                );
            }
        }
    }
}

#[test]
fn faded_entities_leave_and_close_history_on_the_same_tick() {
    let sink = RecordingSink::new();
    let mut population = SyntheticPopulation::new(6, Some(5));
    let mut aggregator = aggregator_with(AggregatorConfig::default().with_seed(5))
        .with_registry(population.registry())
        .with_sink(sink.clone());

    for _ in 0..2_000 {
        population.step(&mut aggregator, 16.0);
        let now = aggregator.elapsed_ms() as u64;
        let overloaded = sink.drain().iter().any(|e| matches!(e, GlitchEvent::Overload { .. }));

        let active: HashMap<EntityId, f64> = aggregator
            .active_entities()
            .into_iter()
            .map(|e| (e.id, e.intensity))
            .collect();

        for record in aggregator.history() {
            match active.get(&record.entity.id) {
                Some(intensity) => {
                    assert!(record.is_open());
                    // overload damping runs after removal, so it may leave a
                    // faded entity behind until the next tick
                    assert!(*intensity > 0.1 || overloaded);
                }
                None => {
                    assert!(!record.is_open());
                    assert_eq!(record.end_reason, Some(EndReason::Faded));
                    assert!(record.ended_ms.is_some_and(|t| t <= now));
                }
            }
        }
    }
}

#[test]
fn user_entity_fades_after_expected_time() {
    let (mut aggregator, _, _) = observed_aggregator();
    let entity = aggregator.create_user_entity(
        Vec2::ZERO,
        GlitchCategory::Base(NodeCategory::Spatial),
        0.5,
        InteractionOptions::new().with_decay(0.1),
    );

    // 0.5 -> 0.1 at 0.1/s takes four seconds
    for _ in 0..39 {
        aggregator.tick(100.0);
    }
    assert!(aggregator.entity(&entity.id).is_some());
    aggregator.tick(100.0);
    aggregator.tick(100.0);
    assert!(aggregator.entity(&entity.id).is_none());

    let record = aggregator.history_record(&entity.id).unwrap();
    assert_eq!(record.end_reason, Some(EndReason::Faded));
    assert!(record.ended_ms.is_some());
}

#[test]
fn weak_sync_is_ignored() {
    let mut aggregator = seeded_aggregator();
    aggregator.record_sync(&[source("1"), source("2")], Vec2::ZERO, 0.3);
    assert_eq!(aggregator.node_count(), 0);
    assert_eq!(aggregator.active_count(), 0);
}

#[test]
fn moderate_sync_adds_one_node_only() {
    let mut aggregator = seeded_aggregator();
    aggregator.record_sync(&[source("1"), source("2")], Vec2::ZERO, 0.5);
    assert_eq!(aggregator.node_count(), 1);
    assert_eq!(aggregator.active_count(), 0);
    assert!(aggregator
        .node(&NodeKey::sync([source("2"), source("1")]))
        .is_some());
}

#[test]
fn strong_sync_of_three_converges() {
    let mut aggregator = seeded_aggregator();
    aggregator.record_sync(&[source("1"), source("2"), source("3")], Vec2::new(10.0, 10.0), 0.8);

    assert_eq!(aggregator.node_count(), 1);
    let active = aggregator.active_entities();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].category, GlitchCategory::ConsciousnessConvergence);
    assert_eq!(active[0].contributors, vec![source("1"), source("2"), source("3")]);
}

#[test]
fn duplicate_sync_participants_count_once() {
    let mut aggregator = seeded_aggregator();
    aggregator.record_sync(&[source("1"), source("1")], Vec2::ZERO, 0.9);
    assert_eq!(aggregator.node_count(), 0);
}

#[test]
fn close_cluster_spawns_one_entity() {
    let (mut aggregator, registry, sink) = observed_aggregator();
    register_sources(&registry, &[("1", Vec2::ZERO), ("2", Vec2::ZERO), ("3", Vec2::ZERO)]);

    distort_all(
        &mut aggregator,
        &[("1", 100.0, 100.0), ("2", 130.0, 100.0), ("3", 115.0, 125.0)],
        NodeCategory::Temporal,
        0.7,
    );

    let active = aggregator.active_entities();
    assert_eq!(active.len(), 1);
    let entity = &active[0];
    assert!(entity.intensity >= 0.7 - 1e-9 && entity.intensity <= 1.5);
    assert_eq!(entity.category, GlitchCategory::Cascade(NodeCategory::Temporal));
    assert_eq!(entity.generation, 0);
    assert!(matches!(entity.origin, EntityOrigin::Emergent { contributing_nodes: 3, .. }));
    assert_eq!(sink.count("collective_distortion"), 1);

    // every contributor hears about it, with the other two as collaborators
    let created: Vec<_> = notices(&sink.events())
        .into_iter()
        .filter_map(|(source, notice)| match notice {
            SourceNotice::GlitchCreated { collaborators, .. } => Some((source, collaborators.len())),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|(_, n)| *n == 2));

    // a further explicit evaluation spawns exactly one more
    assert_eq!(aggregator.evaluate_emergence().len(), 1);
}

#[test]
fn sparse_or_weak_nodes_do_not_emerge() {
    let mut aggregator = seeded_aggregator();
    distort_all(
        &mut aggregator,
        &[("1", 0.0, 0.0), ("2", 60.0, 0.0), ("3", 120.0, 0.0)],
        NodeCategory::Spatial,
        0.9,
    );
    // exactly 60 apart is not linked
    assert_eq!(aggregator.active_count(), 0);

    let mut aggregator = seeded_aggregator();
    distort_all(
        &mut aggregator,
        &[("1", 0.0, 0.0), ("2", 10.0, 0.0), ("3", 20.0, 0.0)],
        NodeCategory::Spatial,
        0.6,
    );
    assert_eq!(aggregator.active_count(), 0);
}

#[test]
fn chained_nodes_form_one_cluster() {
    let mut aggregator = seeded_aggregator();
    distort_all(
        &mut aggregator,
        &[("1", 0.0, 0.0), ("2", 50.0, 0.0), ("3", 100.0, 0.0), ("4", 150.0, 0.0)],
        NodeCategory::Spatial,
        0.9,
    );
    let last = aggregator.history().last().unwrap();
    match &last.entity.origin {
        EntityOrigin::Emergent { contributing_nodes, .. } => assert_eq!(*contributing_nodes, 4),
        other => panic!("unexpected origin: {:?}", other),
    }
}

#[test]
fn unknown_interaction_is_a_no_op() {
    let (mut aggregator, _, sink) = observed_aggregator();
    aggregator.create_user_entity(Vec2::ZERO, GlitchCategory::VoidTear, 0.9, InteractionOptions::new());
    let active_before = aggregator.active_entities();
    let history_before = aggregator.history().len();
    sink.drain();

    for kind in [
        InteractionKind::Harvest,
        InteractionKind::Amplify,
        InteractionKind::Stabilize,
        InteractionKind::Disrupt,
    ] {
        let applied = aggregator.apply_user_interaction(
            &EntityId::from_string("emergent_missing"),
            kind,
            InteractionOptions::new(),
        );
        assert!(!applied);
    }

    assert_eq!(aggregator.active_entities(), active_before);
    assert_eq!(aggregator.history().len(), history_before);
    assert!(aggregator.harvested_entities().is_empty());
    assert!(sink.is_empty());
}

#[test]
fn user_entity_notifies_sources_strictly_within_reach() {
    let (mut aggregator, registry, sink) = observed_aggregator();
    // intensity 0.8 -> radius 48 -> reach 72
    register_sources(
        &registry,
        &[
            ("inside", Vec2::new(71.9, 0.0)),
            ("edge", Vec2::new(0.0, 72.0)),
            ("outside", Vec2::new(100.0, 0.0)),
        ],
    );

    let entity = aggregator.create_user_entity(
        Vec2::ZERO,
        GlitchCategory::DreamEruption,
        0.8,
        InteractionOptions::new().with_user("tester"),
    );
    assert!((entity.radius - 48.0).abs() < 1e-9);
    assert!(entity.is_user_created());

    let detected: Vec<_> = notices(&sink.events())
        .into_iter()
        .filter(|(_, notice)| matches!(notice, SourceNotice::UserGlitchDetected { .. }))
        .map(|(source, _)| source)
        .collect();
    assert_eq!(detected, vec![source("inside")]);
}

#[test]
fn user_entity_intensity_is_capped() {
    let mut aggregator = seeded_aggregator();
    aggregator.record_environment_change(2.0);
    let entity = aggregator.create_user_entity(
        Vec2::ZERO,
        GlitchCategory::TimeEcho,
        0.9,
        InteractionOptions::new(),
    );
    assert_eq!(entity.intensity, 1.2);
    assert!((entity.radius - (20.0 + 1.2 * 35.0)).abs() < 1e-9);
}

#[test]
fn snapshot_is_idempotent() {
    let mut aggregator = seeded_aggregator();
    distort_all(
        &mut aggregator,
        &[("4", 400.0, 400.0), ("1", 0.0, 0.0), ("2", 20.0, 0.0), ("3", 10.0, 15.0)],
        NodeCategory::Dream,
        0.8,
    );
    aggregator.create_user_entity(Vec2::new(5.0, 5.0), GlitchCategory::RealityBleed, 0.7, InteractionOptions::new());

    let first = aggregator.graph_snapshot();
    let second = aggregator.graph_snapshot();
    assert_eq!(first, second);
    assert_eq!(first.nodes.len(), 4);
    assert_eq!(first.entities.len(), 2);
    assert!(first.connections.iter().all(|c| (0.0..=1.0).contains(&c.strength)));
}

#[test]
fn environment_rescaling_is_reversible() {
    let mut aggregator = seeded_aggregator();
    for (i, intensity) in [0.2, 0.45, 0.7].into_iter().enumerate() {
        aggregator.create_user_entity(
            Vec2::new(i as f64 * 500.0, 0.0),
            GlitchCategory::ChronoFracture,
            intensity,
            InteractionOptions::new(),
        );
    }
    let before = aggregator.active_entities();

    aggregator.record_environment_change(2.0);
    aggregator.record_environment_change(0.5);

    let after = aggregator.active_entities();
    for (a, b) in before.iter().zip(after.iter()) {
        assert!((a.intensity - b.intensity).abs() < 1e-9);
        assert!((a.radius - b.radius).abs() < 1e-9);
        for (ea, eb) in a.effects.iter().zip(b.effects.iter()) {
            assert!((ea.strength - eb.strength).abs() < 1e-9);
        }
    }
}

#[test]
fn overlapping_temporal_entities_breed_children() {
    let (mut aggregator, registry, sink) = observed_aggregator();
    register_sources(&registry, &[("1", Vec2::ZERO)]);

    let a = aggregator.create_user_entity(
        Vec2::new(200.0, 200.0),
        GlitchCategory::Base(NodeCategory::Temporal),
        0.9,
        InteractionOptions::new(),
    );
    let b = aggregator.create_user_entity(
        Vec2::new(205.0, 200.0),
        GlitchCategory::Base(NodeCategory::Temporal),
        0.9,
        InteractionOptions::new(),
    );

    for _ in 0..200 {
        aggregator.tick(16.0);
    }

    let children: Vec<_> = aggregator
        .history()
        .iter()
        .filter(|r| matches!(r.entity.origin, EntityOrigin::Child { .. }))
        .collect();
    assert!(!children.is_empty());
    for child in children {
        assert_eq!(child.entity.category, GlitchCategory::TimeFracture);
        assert_eq!(child.entity.generation, 1);
        assert!(child.entity.intensity <= 1.2);
        match &child.entity.origin {
            EntityOrigin::Child { parents, .. } => {
                assert!(parents.contains(&a.id) && parents.contains(&b.id));
            }
            _ => unreachable!(),
        }
    }
    assert!(sink.count("entity_created") > 2);
}

#[test]
fn harvest_then_interact_again_fails() {
    let (mut aggregator, _, sink) = observed_aggregator();
    let entity = aggregator.create_user_entity(Vec2::ZERO, GlitchCategory::DreamWarp, 0.9, InteractionOptions::new());

    assert!(aggregator.apply_user_interaction(&entity.id, InteractionKind::Harvest, InteractionOptions::new()));
    assert!(!aggregator.apply_user_interaction(&entity.id, InteractionKind::Amplify, InteractionOptions::new()));

    assert_eq!(aggregator.harvested_entities()[0].harvested_by, "unknown");
    assert_eq!(sink.count("harvested"), 1);
    assert_eq!(aggregator.history().len(), 1);
    assert!(!aggregator.history()[0].is_open());
}

#[test]
fn clear_active_closes_every_record() {
    let mut aggregator = seeded_aggregator();
    for i in 0..3 {
        aggregator.create_user_entity(Vec2::new(i as f64 * 300.0, 0.0), GlitchCategory::VoidTear, 0.9, InteractionOptions::new());
    }
    aggregator.clear_active();
    assert_eq!(aggregator.active_count(), 0);
    assert!(aggregator
        .history()
        .iter()
        .all(|r| r.end_reason == Some(EndReason::Cleared)));
}

#[test]
fn ingest_dispatches_json_events() {
    let mut aggregator = seeded_aggregator();
    let events = [
        r#"{"event":"environment","intensity":1.2}"#,
        r#"{"event":"distortion","source":"1","position":{"x":0.0,"y":0.0},"category":"temporal","distortion_level":0.9}"#,
        r#"{"event":"distortion","source":"2","position":{"x":10.0,"y":0.0},"category":"temporal","distortion_level":0.9}"#,
        r#"{"event":"sync","participants":["1","2"],"midpoint":{"x":5.0,"y":5.0},"strength":0.9}"#,
    ];
    for json in events {
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        aggregator.ingest(event);
    }

    assert_eq!(aggregator.node_count(), 3);
    assert_eq!(aggregator.global_intensity(), 1.2);
    let active = aggregator.active_entities();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].category, GlitchCategory::TimeEcho);

    let interaction = format!(
        r#"{{"event":"interaction","entity":"{}","kind":"harvest","options":{{"user_id":"json"}}}}"#,
        active[0].id
    );
    aggregator.ingest(serde_json::from_str(&interaction).unwrap());
    assert_eq!(aggregator.active_count(), 0);
    assert_eq!(aggregator.harvested_entities()[0].harvested_by, "json");
}

#[test]
fn memory_and_dream_side_effects_reach_sources() {
    let (mut aggregator, registry, sink) = observed_aggregator();
    register_sources(&registry, &[("1", Vec2::ZERO), ("2", Vec2::ZERO), ("3", Vec2::ZERO)]);
    registry.add_memory(&source("1"), Memory::new("first light").with_importance(1.0));
    registry.add_memory(&source("2"), Memory::new("second light"));
    registry.set_dream(
        &source("3"),
        Some(DreamState {
            depth: DreamDepth::Lucid,
            symbols: vec![DreamSymbol::new("wolf", SymbolKind::Creature)],
        }),
    );

    // temporal + sync nodes emerge as a memory-leaking time echo
    distort_all(&mut aggregator, &[("1", 0.0, 0.0), ("2", 10.0, 0.0)], NodeCategory::Temporal, 0.9);
    aggregator.record_sync(&[source("1"), source("2")], Vec2::new(5.0, 5.0), 0.9);
    // a lucid dream ruptures into a dreamlike entity far away
    aggregator.record_dream_state(source("3"), Vec2::new(600.0, 600.0), 0.95, DreamDepth::Lucid, Vec::new());
    let rupture = aggregator
        .active_entities()
        .into_iter()
        .find(|e| e.category == GlitchCategory::LucidRupture)
        .unwrap();
    aggregator.apply_user_interaction(&rupture.id, InteractionKind::Amplify, InteractionOptions::new().with_boost(1.0));
    sink.drain();

    for _ in 0..400 {
        aggregator.tick(16.0);
    }

    let events = sink.events();
    let fragments: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GlitchEvent::SideEffect(SideEffect::MemoryFragment { source, memory, .. }) => Some((source.clone(), memory.clone())),
            _ => None,
        })
        .collect();
    assert!(!fragments.is_empty());
    assert!(fragments.iter().all(|(s, _)| *s == source("1") || *s == source("2")));

    let manifestations: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GlitchEvent::SideEffect(SideEffect::DreamManifestation { source, symbol, .. }) => Some((source.clone(), symbol.clone())),
            _ => None,
        })
        .collect();
    assert!(!manifestations.is_empty());
    for (s, symbol) in &manifestations {
        assert_eq!(*s, source("3"));
        assert_eq!(symbol.name, "wolf");
        assert_eq!(symbol.intensity, Some(0.7));
    }
    assert!(notices(&events)
        .iter()
        .any(|(s, n)| *s == source("3") && matches!(n, SourceNotice::DreamManifesting { .. })));
}

#[test]
fn environment_change_reruns_emergence() {
    let mut aggregator = seeded_aggregator();
    distort_all(
        &mut aggregator,
        &[("1", 100.0, 100.0), ("2", 130.0, 100.0), ("3", 115.0, 125.0)],
        NodeCategory::Spatial,
        0.7,
    );
    assert_eq!(aggregator.active_count(), 1);

    // nodes are never consumed, so the still-qualifying cluster spawns again
    aggregator.record_environment_change(1.0);
    assert_eq!(aggregator.active_count(), 2);
    assert!(aggregator
        .active_entities()
        .iter()
        .all(|e| e.category == GlitchCategory::Cascade(NodeCategory::Spatial)));
}

#[test]
fn chaos_pulses_inherit_parent_and_skip_decay_on_spawn_tick() {
    let mut aggregator = seeded_aggregator();
    aggregator.record_dream_state(source("7"), Vec2::new(300.0, 300.0), 0.95, DreamDepth::Lucid, Vec::new());
    let parent_id = aggregator.active_entities()[0].id.clone();

    let mut seen: HashSet<EntityId> = HashSet::new();
    for _ in 0..2_000 {
        aggregator.tick(16.0);
        let Some(parent) = aggregator.entity(&parent_id).cloned() else {
            break;
        };
        for pulse in aggregator.active_entities() {
            let EntityOrigin::Pulse { parent: ref from } = pulse.origin else {
                continue;
            };
            if *from != parent_id || !seen.insert(pulse.id.clone()) {
                continue;
            }
            assert_eq!(pulse.category, GlitchCategory::ChaosPulse);
            assert!((pulse.intensity - parent.intensity * 0.8).abs() < 1e-12);
            assert!((pulse.radius - parent.radius * 1.5).abs() < 1e-9);
            assert_eq!(pulse.decay_rate, 0.1);
            assert_eq!(pulse.contributors, parent.contributors);
            assert_eq!(pulse.generation, 0);
        }
        if seen.len() >= 3 {
            break;
        }
    }
    assert!(!seen.is_empty());
}
