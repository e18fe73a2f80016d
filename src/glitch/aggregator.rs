//! GlitchAggregator: the main entry point of the simulation core

use super::category::{EffectKind, GlitchCategory, NodeCategory};
use super::cluster::{self, CLUSTER_DISTANCE, MIN_CLUSTER_SIZE};
use super::entity::{
    EndReason, EntityId, EntityOrigin, GlitchEntity, HarvestedEntity, HistoryRecord,
    MAX_INTENSITY,
};
use super::node::{
    BridgeKind, ContributionNode, DreamDepth, DreamSymbol, NodeDetail, NodeKey, SourceId,
};
use super::snapshot::GraphSnapshot;
use crate::collab::{
    CreationKind, GlitchEvent, GlitchSink, InboundEvent, InteractionKind, InteractionOptions,
    ManifestationBehavior, NullRegistry, NullSink, SideEffect, Significance, SourceNotice,
    SourceRegistry, VisualUpdate,
};
use crate::config::{AggregatorConfig, MAX_GLOBAL_INTENSITY, MIN_GLOBAL_INTENSITY};
use crate::geometry::{Noise2D, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors from constructing or configuring an aggregator
#[derive(Debug, Error)]
pub enum GlitchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for glitchfield operations
pub type GlitchResult<T> = Result<T, GlitchError>;

/// Cluster evaluation and overload checks run this often (ms)
const EVALUATION_INTERVAL_MS: f64 = 500.0;

/// More active entities than this triggers damping
const OVERLOAD_THRESHOLD: usize = 20;
const OVERLOAD_GLOBAL_DAMPING: f64 = 0.9;
const OVERLOAD_ENTITY_DAMPING: f64 = 0.95;

const EMERGENT_DECAY: f64 = 0.015;
const CHILD_DECAY: f64 = 0.04;
const USER_DECAY: f64 = 0.03;
const PULSE_DECAY: f64 = 0.1;

const CHILD_MAX_INTENSITY: f64 = 1.2;
const USER_MAX_INTENSITY: f64 = 1.2;

/// Entities weaker than this emit no side effects
const EFFECT_MIN_INTENSITY: f64 = 0.3;

const DEFAULT_BOOST: f64 = 0.2;
const DEFAULT_STABILIZE_MS: u64 = 30_000;
const STABILIZE_LIGHTEN: u8 = 50;

const NOISE_SCALE: f64 = 0.001;
const NOISE_TIME_SCALE: f64 = 0.0005;

/// Aggregates source distortions into glitch entities.
///
/// Owns every node, active entity, harvested entity and history record.
/// All mutation goes through `&mut self`: ingest operations react to host
/// events, `tick` advances the simulation.
pub struct GlitchAggregator {
    config: AggregatorConfig,
    nodes: BTreeMap<NodeKey, ContributionNode>,
    active: Vec<GlitchEntity>,
    harvested: Vec<HarvestedEntity>,
    history: Vec<HistoryRecord>,
    history_index: HashMap<EntityId, usize>,
    global_intensity: f64,
    elapsed_ms: f64,
    since_evaluation_ms: f64,
    next_seq: u64,
    rng: StdRng,
    noise: Noise2D,
    registry: Box<dyn SourceRegistry>,
    sink: Box<dyn GlitchSink>,
}

impl std::fmt::Debug for GlitchAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlitchAggregator")
            .field("nodes", &self.nodes.len())
            .field("active", &self.active.len())
            .field("harvested", &self.harvested.len())
            .field("history", &self.history.len())
            .field("global_intensity", &self.global_intensity)
            .field("elapsed_ms", &self.elapsed_ms)
            .finish()
    }
}

impl GlitchAggregator {
    /// Create an aggregator with no registry and a discarding sink
    pub fn new(config: AggregatorConfig) -> GlitchResult<Self> {
        config.validate()?;

        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise = Noise2D::new(&mut rng);

        Ok(Self {
            global_intensity: config.global_intensity,
            config,
            nodes: BTreeMap::new(),
            active: Vec::new(),
            harvested: Vec::new(),
            history: Vec::new(),
            history_index: HashMap::new(),
            elapsed_ms: 0.0,
            since_evaluation_ms: 0.0,
            next_seq: 0,
            rng,
            noise,
            registry: Box::new(NullRegistry),
            sink: Box::new(NullSink),
        })
    }

    /// Set the source registry
    pub fn with_registry(mut self, registry: impl SourceRegistry + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    /// Set the event sink
    pub fn with_sink(mut self, sink: impl GlitchSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    // ---------------------------------------------------------------
    // Ingest
    // ---------------------------------------------------------------

    /// Dispatch any inbound event
    pub fn ingest(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Distortion(e) => {
                self.record_distortion_with(e.source, e.position, e.category, e.distortion_level, e.content)
            }
            InboundEvent::Dream(e) => {
                self.record_dream_state(e.source, e.position, e.intensity, e.depth, e.symbols)
            }
            InboundEvent::Sync(e) => self.record_sync(&e.participants, e.midpoint, e.strength),
            InboundEvent::Environment { intensity } => self.record_environment_change(intensity),
            InboundEvent::Interaction(i) => {
                self.apply_user_interaction(&i.entity, i.kind, i.options);
            }
        }
    }

    /// Record a source's memory distortion
    pub fn record_distortion(
        &mut self,
        source: SourceId,
        position: Vec2,
        category: NodeCategory,
        distortion_level: f64,
    ) {
        self.record_distortion_with(source, position, category, distortion_level, None);
    }

    fn record_distortion_with(
        &mut self,
        source: SourceId,
        position: Vec2,
        category: NodeCategory,
        distortion_level: f64,
        content: Option<String>,
    ) {
        let level = distortion_level.max(0.0);
        let intensity = (level * self.global_intensity).min(1.0);
        let radius = 10.0 + level * 20.0;

        self.insert_node(
            NodeKey::Distortion(source),
            position,
            category,
            intensity,
            radius,
            NodeDetail::Memory { content },
        );
        self.evaluate_emergence();
        self.publish_graph();
    }

    /// Record a source's dream.
    ///
    /// Dreams at or below 0.7 intensity are ignored. Above 0.9 the dream
    /// ruptures on its own, bypassing threshold clustering.
    pub fn record_dream_state(
        &mut self,
        source: SourceId,
        position: Vec2,
        intensity: f64,
        depth: DreamDepth,
        symbols: Vec<DreamSymbol>,
    ) {
        if !(intensity > 0.7) {
            return;
        }

        let jitter = Vec2::new(
            (self.rng.gen::<f64>() - 0.5) * 20.0,
            (self.rng.gen::<f64>() - 0.5) * 20.0,
        );
        let key = NodeKey::Dream(source);
        self.insert_node(
            key.clone(),
            position + jitter,
            NodeCategory::Dream,
            (intensity * 0.8 * self.global_intensity).min(1.0),
            15.0 + intensity * 25.0,
            NodeDetail::Dream { symbols, depth },
        );

        if intensity > 0.9 {
            let forced = if depth == DreamDepth::Lucid {
                GlitchCategory::LucidRupture
            } else {
                GlitchCategory::DreamRupture
            };
            if let Some(node) = self.nodes.get(&key).cloned() {
                self.spawn_emergent(&[node], Some(forced));
            }
        } else {
            self.evaluate_emergence();
        }
        self.publish_graph();
    }

    /// Record a consciousness sync between sources.
    ///
    /// Needs strength above 0.4 and at least two distinct participants.
    /// Strong syncs (above 0.6, three or more participants) converge into
    /// an entity immediately.
    pub fn record_sync(&mut self, participants: &[SourceId], midpoint: Vec2, strength: f64) {
        let key = NodeKey::sync(participants.iter().cloned());
        let count = key.sources().len();
        if !(strength > 0.4) || count < 2 {
            return;
        }

        self.insert_node(
            key,
            midpoint,
            NodeCategory::Sync,
            (strength * self.global_intensity).min(1.0),
            30.0 * strength * (count as f64).sqrt(),
            NodeDetail::Sync {
                bridge: BridgeKind::for_strength(strength),
                strength,
            },
        );

        if strength > 0.6 && count >= 3 {
            let members: Vec<ContributionNode> = self
                .nodes
                .values()
                .filter(|n| {
                    n.category == NodeCategory::Sync
                        || n
                            .key
                            .single_source()
                            .is_some_and(|s| participants.contains(s))
                })
                .cloned()
                .collect();
            self.spawn_emergent(&members, Some(GlitchCategory::ConsciousnessConvergence));
        } else {
            self.evaluate_emergence();
        }
        self.publish_graph();
    }

    /// Apply an environment transition.
    ///
    /// The multiplier (clamped to [0.5, 2.0]) becomes the global intensity
    /// and rescales every active entity.
    pub fn record_environment_change(&mut self, intensity_multiplier: f64) {
        self.global_intensity = clamp_global(intensity_multiplier);
        for entity in &mut self.active {
            entity.rescale(self.global_intensity);
        }
        info!(
            global_intensity = self.global_intensity,
            active = self.active.len(),
            "environment changed"
        );
        self.evaluate_emergence();
    }

    /// Set the global multiplier directly, scaling active intensities
    pub fn set_global_intensity(&mut self, factor: f64) {
        self.global_intensity = clamp_global(factor);
        for entity in &mut self.active {
            entity.intensity = (entity.intensity * self.global_intensity).min(MAX_INTENSITY);
        }
    }

    /// Apply a user interaction to an active entity.
    ///
    /// Returns `false` and changes nothing when `id` is not active.
    pub fn apply_user_interaction(
        &mut self,
        id: &EntityId,
        kind: InteractionKind,
        options: InteractionOptions,
    ) -> bool {
        let Some(index) = self.active.iter().position(|e| &e.id == id) else {
            return false;
        };
        let now = self.now_ms();
        let amplifier = self.config.interaction_amplifier;

        let entity = match kind {
            InteractionKind::Harvest => {
                let entity = self.active.remove(index);
                let by = options.user_id.unwrap_or_else(|| "unknown".to_string());
                self.close_history(&entity.id, EndReason::Harvested { by: by.clone() });
                self.harvested.push(HarvestedEntity {
                    entity: entity.clone(),
                    harvested_ms: now,
                    harvested_at: chrono::Utc::now(),
                    harvested_by: by.clone(),
                });
                self.sink.emit(GlitchEvent::Harvested {
                    id: entity.id.clone(),
                    by,
                });
                entity
            }
            InteractionKind::Amplify => {
                let entity = &mut self.active[index];
                let boost = options.boost.unwrap_or(DEFAULT_BOOST);
                entity.intensity = (entity.intensity + boost).min(MAX_INTENSITY);
                entity.radius *= amplifier;
                entity.flags.amplified = true;
                entity.flags.amplification_count += 1;
                let entity = entity.clone();
                for source in &entity.contributors {
                    self.notify_known(
                        source,
                        SourceNotice::ConsciousnessInfluenced {
                            entity: entity.id.clone(),
                            intensity: 0.3 * amplifier,
                        },
                    );
                }
                entity
            }
            InteractionKind::Stabilize => {
                let entity = &mut self.active[index];
                entity.intensity *= 0.7;
                entity.decay_rate *= 0.5;
                entity.flags.stabilized_until =
                    Some(now.saturating_add(options.duration_ms.unwrap_or(DEFAULT_STABILIZE_MS)));
                entity.color = entity.color.lighten(STABILIZE_LIGHTEN);
                entity.clone()
            }
            InteractionKind::Disrupt => {
                let entity = &mut self.active[index];
                entity.intensity *= 0.5;
                entity.radius *= 0.8;
                entity.flags.disrupted = true;
                let entity = entity.clone();
                for source in &entity.contributors {
                    self.notify_known(
                        source,
                        SourceNotice::GlitchDisrupted {
                            entity: entity.id.clone(),
                            intensity: entity.intensity,
                        },
                    );
                }
                entity
            }
        };

        debug!(id = %entity.id, interaction = %kind, "user interaction");
        self.sink.emit(GlitchEvent::Feedback {
            kind,
            id: entity.id.clone(),
            position: entity.position,
            intensity: entity.intensity,
            elapsed_ms: now,
        });
        self.sink.emit(GlitchEvent::EntityUpdated(visual_update(&entity)));
        self.publish_graph();
        true
    }

    /// Create an entity on a user's behalf and alert nearby sources
    pub fn create_user_entity(
        &mut self,
        position: Vec2,
        category: GlitchCategory,
        intensity: f64,
        options: InteractionOptions,
    ) -> GlitchEntity {
        let intensity = (intensity.max(0.0) * self.global_intensity).min(USER_MAX_INTENSITY);
        let radius = 20.0 + intensity * 35.0;
        let decay = options
            .decay
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(USER_DECAY);
        let user_id = options.user_id.unwrap_or_else(|| "unknown".to_string());

        let entity = GlitchEntity::new(
            EntityId::generate("user", &mut self.rng),
            EntityOrigin::User { user_id },
            category,
            position,
            self.now_ms(),
        )
        .with_intensity(intensity)
        .with_radius(radius)
        .with_decay(decay);
        self.push_entity(entity.clone());

        let reach = radius * 1.5;
        for profile in self.registry.sources() {
            let distance = profile.position.distance(position);
            if distance < reach {
                self.notify(
                    profile.id,
                    SourceNotice::UserGlitchDetected {
                        entity: entity.id.clone(),
                        category,
                        intensity,
                        distance,
                    },
                );
            }
        }
        entity
    }

    // ---------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------

    /// Advance the simulation by `delta_ms`.
    ///
    /// Order: decay, interaction, effects, expiry, periodic evaluation,
    /// visual refresh. Entities spawned during a tick first decay and
    /// interact on the next one.
    pub fn tick(&mut self, delta_ms: f64) {
        let delta = if delta_ms.is_finite() && delta_ms > 0.0 {
            delta_ms
        } else {
            0.0
        };
        self.elapsed_ms += delta;
        let now = self.now_ms();

        // Decay and cosmetic drift
        let t = self.elapsed_ms * NOISE_TIME_SCALE;
        for entity in &mut self.active {
            match entity.flags.stabilized_until {
                None => entity.intensity -= entity.decay_rate * (delta / 1000.0),
                Some(until) if now > until => entity.flags.stabilized_until = None,
                Some(_) => {}
            }
            let offset = Vec2::new(
                self.noise.sample(entity.position.x * NOISE_SCALE, t),
                self.noise.sample(entity.position.y * NOISE_SCALE, t + 100.0),
            ) * (3.0 * entity.intensity);
            entity.visual_position = entity.position + offset * 10.0;
        }

        let mut spawned = self.process_interactions();

        for index in 0..self.active.len() {
            if self.active[index].intensity > EFFECT_MIN_INTENSITY {
                let entity = self.active[index].clone();
                self.emit_effects(&entity, &mut spawned);
            }
        }

        for entity in spawned {
            let is_child = matches!(entity.origin, EntityOrigin::Child { .. });
            self.push_entity(entity.clone());
            if is_child {
                self.notify_contributors(&entity, CreationKind::Child);
            }
        }

        self.remove_expired();

        self.since_evaluation_ms += delta;
        if self.since_evaluation_ms >= EVALUATION_INTERVAL_MS {
            self.since_evaluation_ms %= EVALUATION_INTERVAL_MS;
            self.evaluate_emergence();
            self.check_overload();
        }

        let updates = self.active.iter().map(visual_update).collect();
        self.sink.emit(GlitchEvent::VisualsRefreshed { updates });
        trace!(
            elapsed_ms = self.elapsed_ms,
            active = self.active.len(),
            nodes = self.nodes.len(),
            "tick"
        );
    }

    /// Pairwise interactions over every unordered pair; returns children
    fn process_interactions(&mut self) -> Vec<GlitchEntity> {
        let amplifier = self.config.interaction_amplifier;
        let now = self.now_ms();
        let mut children = Vec::new();

        for i in 0..self.active.len() {
            for j in (i + 1)..self.active.len() {
                let (a, b) = (&self.active[i], &self.active[j]);
                let Some((category, strength)) = interaction(a, b, amplifier) else {
                    continue;
                };
                if self.rng.gen::<f64>() >= strength * 0.2 {
                    continue;
                }

                let jitter = Vec2::new(
                    (self.rng.gen::<f64>() - 0.5) * 10.0,
                    (self.rng.gen::<f64>() - 0.5) * 10.0,
                );
                let child = GlitchEntity::new(
                    EntityId::generate("child", &mut self.rng),
                    EntityOrigin::Child {
                        parents: [a.id.clone(), b.id.clone()],
                        parent_categories: [a.category, b.category],
                    },
                    category,
                    a.position.midpoint(b.position) + jitter,
                    now,
                )
                .with_intensity(
                    ((a.intensity + b.intensity) * 0.6 * self.global_intensity)
                        .min(CHILD_MAX_INTENSITY),
                )
                .with_radius(a.radius.min(b.radius) * amplifier)
                .with_decay(CHILD_DECAY)
                .with_contributors(union_sources([a.contributors.as_slice(), b.contributors.as_slice()]))
                .with_generation(a.generation.max(b.generation) + 1);

                debug!(id = %child.id, category = %category, strength, "child entity spawned");
                children.push(child);
            }
        }
        children
    }

    fn emit_effects(&mut self, entity: &GlitchEntity, spawned: &mut Vec<GlitchEntity>) {
        let intensity = entity.intensity;
        for effect in &entity.effects {
            let draw = self.rng.gen::<f64>();
            match effect.kind {
                EffectKind::TemporalDistortion => {
                    if draw < intensity.min(1.0) {
                        self.sink.emit(GlitchEvent::SideEffect(SideEffect::TemporalDistortion {
                            entity: entity.id.clone(),
                            position: entity.position,
                            radius: entity.radius * 0.8,
                            factor: 1.0 + (intensity - 0.5) * effect.strength,
                        }));
                    }
                }
                EffectKind::RealityBlur => {
                    if draw < intensity.min(1.0) {
                        self.sink.emit(GlitchEvent::SideEffect(SideEffect::RealityBlur {
                            entity: entity.id.clone(),
                            position: entity.position,
                            radius: entity.radius,
                            intensity: intensity * effect.strength,
                        }));
                    }
                }
                EffectKind::MemoryLeak => {
                    if draw < 0.06 * intensity {
                        self.spawn_memory_fragment(entity);
                    }
                }
                EffectKind::DreamManifestation => {
                    if draw < 0.04 * intensity {
                        self.manifest_dream(entity);
                    }
                }
                EffectKind::ChaosPulse => {
                    if draw < 0.03 * intensity {
                        let pulse = self.make_pulse(entity);
                        spawned.push(pulse);
                    }
                }
            }
        }
    }

    fn spawn_memory_fragment(&mut self, entity: &GlitchEntity) {
        if entity.contributors.is_empty() {
            return;
        }
        let pick = self.rng.gen_range(0..entity.contributors.len());
        let source = entity.contributors[pick].clone();
        if self.registry.profile(&source).is_none() {
            return;
        }
        let Some(memory) = self.registry.random_memory(&source, &mut self.rng) else {
            return;
        };

        let importance = memory.importance.unwrap_or(0.5);
        let angle = self.rng.gen::<f64>() * std::f64::consts::TAU;
        let distance = entity.radius * 0.6 * self.rng.gen::<f64>();
        let velocity = Vec2::new(
            (self.rng.gen::<f64>() - 0.5) * 0.2,
            (self.rng.gen::<f64>() - 0.5) * 0.2,
        );

        self.sink.emit(GlitchEvent::SideEffect(SideEffect::MemoryFragment {
            entity: entity.id.clone(),
            source,
            position: entity.position.offset_polar(angle, distance),
            memory,
            visual_intensity: 0.5 + importance * 0.5,
            duration_ms: 5000.0 + importance * 10_000.0,
            velocity,
        }));
    }

    fn manifest_dream(&mut self, entity: &GlitchEntity) {
        if !entity.is_dreamlike() {
            return;
        }

        let dreamer = entity.contributors.iter().find_map(|source| {
            self.registry.profile(source)?;
            let dream = self.registry.dream_state(source)?;
            (!dream.symbols.is_empty()).then(|| (source.clone(), dream))
        });
        let Some((source, dream)) = dreamer else {
            return;
        };

        let mut symbol = dream.symbols[self.rng.gen_range(0..dream.symbols.len())].clone();
        let visual_intensity = 0.6 + symbol.intensity.unwrap_or(0.0) * 0.5;
        symbol.intensity.get_or_insert(0.7);
        let angle = self.rng.gen::<f64>() * std::f64::consts::TAU;
        let distance = entity.radius * 0.8 * self.rng.gen::<f64>();
        let duration_ms = 8000.0 + self.rng.gen::<f64>() * 8000.0;
        let name = symbol.name.clone();

        self.sink.emit(GlitchEvent::SideEffect(SideEffect::DreamManifestation {
            entity: entity.id.clone(),
            source: source.clone(),
            position: entity.position.offset_polar(angle, distance),
            behavior: ManifestationBehavior::for_symbol(symbol.kind),
            symbol,
            visual_intensity,
            duration_ms,
        }));
        self.notify(
            source,
            SourceNotice::DreamManifesting {
                symbol: name,
                intensity: visual_intensity,
            },
        );
    }

    fn make_pulse(&mut self, parent: &GlitchEntity) -> GlitchEntity {
        GlitchEntity::new(
            EntityId::generate("pulse", &mut self.rng),
            EntityOrigin::Pulse {
                parent: parent.id.clone(),
            },
            GlitchCategory::ChaosPulse,
            parent.position,
            self.now_ms(),
        )
        .with_intensity(parent.intensity * 0.8)
        .with_radius(parent.radius * 1.5)
        .with_decay(PULSE_DECAY)
        .with_contributors(parent.contributors.clone())
    }

    fn remove_expired(&mut self) {
        let now = self.now_ms();
        let window = self.config.node_persistence_ms;
        self.nodes.retain(|_, node| !node.expired(now, window));

        let (spent, live): (Vec<GlitchEntity>, Vec<GlitchEntity>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|e| e.is_spent());
        self.active = live;

        for entity in spent {
            debug!(id = %entity.id, "entity faded");
            self.close_history(&entity.id, EndReason::Faded);
            self.sink.emit(GlitchEvent::EntityRemoved { id: entity.id });
        }
    }

    fn check_overload(&mut self) {
        if self.active.len() <= OVERLOAD_THRESHOLD {
            return;
        }
        self.global_intensity =
            (self.global_intensity * OVERLOAD_GLOBAL_DAMPING).max(MIN_GLOBAL_INTENSITY);
        for entity in &mut self.active {
            entity.intensity *= OVERLOAD_ENTITY_DAMPING;
        }
        info!(
            active = self.active.len(),
            global_intensity = self.global_intensity,
            "overload damping applied"
        );
        self.sink.emit(GlitchEvent::Overload {
            active_count: self.active.len(),
            reduction_factor: OVERLOAD_ENTITY_DAMPING,
        });
    }

    // ---------------------------------------------------------------
    // Emergence
    // ---------------------------------------------------------------

    /// Cluster the live nodes and spawn an entity for every cluster of
    /// three or more whose mean intensity exceeds the threshold.
    ///
    /// Returns the ids of spawned entities.
    pub fn evaluate_emergence(&mut self) -> Vec<EntityId> {
        if self.nodes.len() < MIN_CLUSTER_SIZE {
            return Vec::new();
        }

        let threshold = self.config.distortion_threshold;
        let qualifying: Vec<Vec<ContributionNode>> = {
            let nodes: Vec<&ContributionNode> = self.nodes.values().collect();
            cluster::single_link(&nodes, CLUSTER_DISTANCE)
                .into_iter()
                .filter(|c| c.len() >= MIN_CLUSTER_SIZE && cluster::mean_intensity(c) > threshold)
                .map(|c| c.into_iter().cloned().collect())
                .collect()
        };

        qualifying
            .iter()
            .filter_map(|c| self.spawn_emergent(c, None))
            .collect()
    }

    /// Spawn an emergent entity from `cluster`.
    ///
    /// `forced` overrides the category derived from the cluster's node
    /// categories. Returns `None` for an empty cluster.
    pub fn spawn_emergent(
        &mut self,
        cluster: &[ContributionNode],
        forced: Option<GlitchCategory>,
    ) -> Option<EntityId> {
        let position = Vec2::centroid(cluster.iter().map(|n| n.position))?;
        let size = cluster.len();
        let categories: Vec<NodeCategory> = cluster.iter().map(|n| n.category).collect();
        let category = forced.unwrap_or_else(|| GlitchCategory::emergent(&categories));
        let contributors = union_sources(cluster.iter().map(|n| n.sources()));

        let refs: Vec<&ContributionNode> = cluster.iter().collect();
        let mean = cluster::mean_intensity(&refs);
        let bonus = (0.4f64).min((size as f64 - 3.0) * 0.15) * self.global_intensity;
        let intensity = (mean + bonus).clamp(0.0, MAX_INTENSITY);
        let radius = 40.0 + size as f64 * 5.0 + intensity * 25.0;

        let entity = GlitchEntity::new(
            EntityId::generate("emergent", &mut self.rng),
            EntityOrigin::Emergent {
                contributing_nodes: size,
                source_categories: categories,
            },
            category,
            position,
            self.now_ms(),
        )
        .with_intensity(intensity)
        .with_radius(radius)
        .with_decay(EMERGENT_DECAY)
        .with_contributors(contributors);

        debug!(
            id = %entity.id,
            category = %category,
            intensity,
            nodes = size,
            "emergent entity spawned"
        );
        self.push_entity(entity.clone());
        self.sink.emit(GlitchEvent::CollectiveDistortion {
            id: entity.id.clone(),
            sources: entity.contributors.clone(),
            category,
            intensity,
            position,
        });
        self.notify_contributors(&entity, CreationKind::Emergent);
        Some(entity.id)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// Copy of the active entities
    pub fn active_entities(&self) -> Vec<GlitchEntity> {
        self.active.clone()
    }

    /// Active entity by id
    pub fn entity(&self, id: &EntityId) -> Option<&GlitchEntity> {
        self.active.iter().find(|e| &e.id == id)
    }

    /// Number of active entities
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Harvested entities, oldest first
    pub fn harvested_entities(&self) -> &[HarvestedEntity] {
        &self.harvested
    }

    /// Every entity ever created, in creation order
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// History record of any entity ever created
    pub fn history_record(&self, id: &EntityId) -> Option<&HistoryRecord> {
        self.history_index.get(id).map(|&i| &self.history[i])
    }

    /// Live contribution nodes in key order
    pub fn nodes(&self) -> impl Iterator<Item = &ContributionNode> {
        self.nodes.values()
    }

    /// Live contribution node by key
    pub fn node(&self, key: &NodeKey) -> Option<&ContributionNode> {
        self.nodes.get(key)
    }

    /// Number of live contribution nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Current global intensity multiplier
    pub fn global_intensity(&self) -> f64 {
        self.global_intensity
    }

    /// Simulated milliseconds since creation
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Settings this aggregator was built with
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Current graph view; does not mutate
    pub fn graph_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::build(&self.nodes, &self.active)
    }

    /// Drop every active entity, closing their history records
    pub fn clear_active(&mut self) {
        for entity in std::mem::take(&mut self.active) {
            self.close_history(&entity.id, EndReason::Cleared);
            self.sink.emit(GlitchEvent::EntityRemoved { id: entity.id });
        }
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn now_ms(&self) -> u64 {
        self.elapsed_ms as u64
    }

    fn insert_node(
        &mut self,
        key: NodeKey,
        position: Vec2,
        category: NodeCategory,
        intensity: f64,
        radius: f64,
        detail: NodeDetail,
    ) {
        if !self.nodes.contains_key(&key) && self.nodes.len() >= self.config.max_nodes {
            self.evict_oldest_node();
        }
        let node = ContributionNode {
            key: key.clone(),
            position,
            category,
            intensity,
            radius,
            color: category.color(),
            created_ms: self.now_ms(),
            seq: self.next_seq,
            detail,
        };
        self.next_seq += 1;
        self.nodes.insert(key, node);
    }

    fn evict_oldest_node(&mut self) {
        let oldest = self
            .nodes
            .values()
            .min_by_key(|n| (n.created_ms, n.seq))
            .map(|n| n.key.clone());
        if let Some(key) = oldest {
            trace!(node = %key, "evicting oldest node");
            self.nodes.remove(&key);
        }
    }

    fn push_entity(&mut self, entity: GlitchEntity) {
        self.history_index
            .insert(entity.id.clone(), self.history.len());
        self.history
            .push(HistoryRecord::open(entity.clone(), self.now_ms()));
        self.sink.emit(GlitchEvent::EntityCreated {
            id: entity.id.clone(),
            category: entity.category,
            position: entity.position,
            intensity: entity.intensity,
            generation: entity.generation,
        });
        self.active.push(entity);
    }

    fn close_history(&mut self, id: &EntityId, reason: EndReason) {
        let now = self.now_ms();
        if let Some(&index) = self.history_index.get(id) {
            self.history[index].close(now, reason);
        }
    }

    fn notify(&mut self, source: SourceId, notice: SourceNotice) {
        self.sink.emit(GlitchEvent::SourceNotified { source, notice });
    }

    /// Notify `source` only if the registry still knows it
    fn notify_known(&mut self, source: &SourceId, notice: SourceNotice) {
        if self.registry.profile(source).is_some() {
            self.notify(source.clone(), notice);
        }
    }

    fn notify_contributors(&mut self, entity: &GlitchEntity, kind: CreationKind) {
        for source in &entity.contributors {
            let collaborators = entity
                .contributors
                .iter()
                .filter(|id| *id != source)
                .cloned()
                .collect();
            self.notify_known(
                source,
                SourceNotice::GlitchCreated {
                    kind,
                    entity: entity.id.clone(),
                    category: entity.category,
                    collaborators,
                    intensity: entity.intensity,
                    significance: Significance::for_intensity(entity.intensity),
                },
            );
        }
    }

    fn publish_graph(&mut self) {
        let snapshot = self.graph_snapshot();
        self.sink.emit(GlitchEvent::GraphUpdated(snapshot));
    }
}

fn clamp_global(factor: f64) -> f64 {
    if factor.is_nan() {
        return 1.0;
    }
    factor.clamp(MIN_GLOBAL_INTENSITY, MAX_GLOBAL_INTENSITY)
}

/// Child category and interaction strength for a pair, when the pair is
/// close enough, strong enough, and listed in the interaction table
fn interaction(a: &GlitchEntity, b: &GlitchEntity, amplifier: f64) -> Option<(GlitchCategory, f64)> {
    let reach = (a.radius + b.radius) * amplifier;
    let distance = a.position.distance(b.position);
    if !(distance < reach) {
        return None;
    }
    let strength = 1.0 - distance / reach;
    let category = GlitchCategory::interaction_child(a.category, b.category)?;
    (strength > 0.6).then_some((category, strength))
}

/// Deduplicated union of source lists, in first-seen order
fn union_sources<'a, I>(lists: I) -> Vec<SourceId>
where
    I: IntoIterator<Item = &'a [SourceId]>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for id in list {
            if seen.insert(id) {
                out.push(id.clone());
            }
        }
    }
    out
}

fn visual_update(entity: &GlitchEntity) -> VisualUpdate {
    VisualUpdate {
        id: entity.id.clone(),
        position: entity.visual_position,
        intensity: entity.intensity,
        radius: entity.radius,
        effects: entity.effects.clone(),
        generation: entity.generation,
    }
}
