//! Synthetic agent population that feeds an aggregator.
//!
//! Stands in for a host simulation: agents sit on a circle, wander a
//! little, and now and then dream, distort a memory or sync with
//! neighbours. Used by the `glitchfield` binary and by tests that want
//! realistic traffic.

use crate::collab::{DreamState, InMemoryRegistry, Memory, SourceProfile, SyncEvent};
use crate::geometry::Vec2;
use crate::glitch::{DreamDepth, DreamSymbol, GlitchAggregator, NodeCategory, SourceId, SymbolKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

const CENTER: Vec2 = Vec2 { x: 400.0, y: 300.0 };
const RING_RADIUS: f64 = 200.0;

/// Per-step chance an agent toggles its dream state
const DREAM_TOGGLE_CHANCE: f64 = 0.03;
/// Per-step chance an agent considers distorting a memory
const DISTORTION_CHANCE: f64 = 0.08;
const MAX_SYNC_PARTNERS: usize = 2;
const WANDER: f64 = 1.0;

const MEMORIES: [&str; 6] = [
    "a door that opened twice",
    "the smell of rain on circuitry",
    "a conversation heard backwards",
    "the corridor that kept going",
    "a name nobody remembers giving",
    "light arriving before the lamp",
];

const SYMBOLS: [(&str, SymbolKind); 6] = [
    ("stranger", SymbolKind::Person),
    ("wolf", SymbolKind::Creature),
    ("key", SymbolKind::Object),
    ("flooded city", SymbolKind::Landscape),
    ("spiral", SymbolKind::Abstract),
    ("echo", SymbolKind::Other),
];

/// Environment presets a host can transition between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Default,
    Forest,
    Digital,
    Abstract,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Default,
        Environment::Forest,
        Environment::Digital,
        Environment::Abstract,
    ];

    /// Global intensity multiplier applied on transition
    pub fn intensity(&self) -> f64 {
        match self {
            Environment::Default => 1.0,
            Environment::Forest => 0.8,
            Environment::Digital => 1.2,
            Environment::Abstract => 1.5,
        }
    }

    /// Base chance that the transition stresses an agent into distorting
    pub fn glitch_chance(&self) -> f64 {
        match self {
            Environment::Default => 0.1,
            Environment::Forest => 0.15,
            Environment::Digital => 0.25,
            Environment::Abstract => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Default => "default",
            Environment::Forest => "forest",
            Environment::Digital => "digital",
            Environment::Abstract => "abstract",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown environment: {}", s))
    }
}

/// One synthetic agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: SourceId,
    pub position: Vec2,
    /// 40 - 80
    pub curiosity: f64,
    /// 30 - 70
    pub social_affinity: f64,
    /// 40 - 80
    pub adaptability: f64,
    pub dreaming: bool,
}

/// Seeded population of agents driving an aggregator
#[derive(Debug)]
pub struct SyntheticPopulation {
    agents: Vec<Agent>,
    registry: InMemoryRegistry,
    environment: Environment,
    rng: StdRng,
}

impl SyntheticPopulation {
    /// Place `count` agents evenly around the ring and register them.
    ///
    /// The same `seed` always yields the same agents and the same event
    /// stream.
    pub fn new(count: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let registry = InMemoryRegistry::new();

        let agents: Vec<Agent> = (0..count)
            .map(|i| {
                let angle = i as f64 / count as f64 * std::f64::consts::TAU;
                Agent {
                    id: SourceId::new((i + 1).to_string()),
                    position: CENTER.offset_polar(angle, RING_RADIUS),
                    curiosity: rng.gen_range(40.0..80.0),
                    social_affinity: rng.gen_range(30.0..70.0),
                    adaptability: rng.gen_range(40.0..80.0),
                    dreaming: false,
                }
            })
            .collect();

        for agent in &agents {
            registry.register(
                SourceProfile::new(agent.id.clone(), agent.position)
                    .with_attribute("curiosity", agent.curiosity)
                    .with_attribute("social_affinity", agent.social_affinity)
                    .with_attribute("adaptability", agent.adaptability),
            );
            for content in MEMORIES.choose_multiple(&mut rng, 2) {
                registry.add_memory(
                    &agent.id,
                    Memory::new(*content).with_importance(rng.gen()),
                );
            }
        }

        Self {
            agents,
            registry,
            environment: Environment::Default,
            rng,
        }
    }

    /// Registry handle to give the aggregator
    pub fn registry(&self) -> InMemoryRegistry {
        self.registry.clone()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// One host step: agents wander and may dream, distort or sync, then
    /// the aggregator ticks by `delta_ms`.
    pub fn step(&mut self, aggregator: &mut GlitchAggregator, delta_ms: f64) {
        for i in 0..self.agents.len() {
            self.wander(i);
            self.maybe_toggle_dream(i, aggregator);
            self.maybe_distort(i, aggregator);
            self.maybe_sync(i, aggregator);
        }
        aggregator.tick(delta_ms);
    }

    /// Switch environment; returns how many agents were stressed into a
    /// distortion by the transition.
    pub fn set_environment(&mut self, aggregator: &mut GlitchAggregator, environment: Environment) -> usize {
        self.environment = environment;
        aggregator.record_environment_change(environment.intensity());

        let mut stressed = 0;
        for agent in &self.agents {
            let stress = (1.0 - agent.adaptability / 100.0) * environment.glitch_chance();
            if self.rng.gen::<f64>() < stress {
                aggregator.record_distortion(agent.id.clone(), agent.position, NodeCategory::Spatial, stress);
                stressed += 1;
            }
        }
        debug!(%environment, stressed, "environment transition");
        stressed
    }

    fn wander(&mut self, i: usize) {
        let offset = Vec2::new(
            self.rng.gen_range(-WANDER..WANDER),
            self.rng.gen_range(-WANDER..WANDER),
        );
        let agent = &mut self.agents[i];
        agent.position = agent.position + offset;
        self.registry.set_position(&agent.id, agent.position);
    }

    fn maybe_toggle_dream(&mut self, i: usize, aggregator: &mut GlitchAggregator) {
        if self.rng.gen::<f64>() >= DREAM_TOGGLE_CHANCE {
            return;
        }
        let dreaming = !self.agents[i].dreaming;
        self.agents[i].dreaming = dreaming;
        let agent = &self.agents[i];

        if !dreaming {
            self.registry.set_dream(&agent.id, None);
            debug!(agent = %agent.id, "agent awoke");
            return;
        }

        let depth = *[DreamDepth::Shallow, DreamDepth::Deep, DreamDepth::Lucid]
            .choose(&mut self.rng)
            .unwrap_or(&DreamDepth::Shallow);
        let picks: Vec<&(&str, SymbolKind)> = SYMBOLS.choose_multiple(&mut self.rng, 2).collect();
        let symbols: Vec<DreamSymbol> = picks
            .into_iter()
            .map(|(name, kind)| DreamSymbol::new(*name, *kind).with_intensity(self.rng.gen()))
            .collect();
        let intensity = self.rng.gen::<f64>();

        self.registry.set_dream(
            &agent.id,
            Some(DreamState {
                depth,
                symbols: symbols.clone(),
            }),
        );
        debug!(agent = %agent.id, intensity, "agent entered dream state");
        aggregator.record_dream_state(agent.id.clone(), agent.position, intensity, depth, symbols);
    }

    fn maybe_distort(&mut self, i: usize, aggregator: &mut GlitchAggregator) {
        let agent = &self.agents[i];
        if self.rng.gen::<f64>() >= DISTORTION_CHANCE
            || self.rng.gen::<f64>() >= agent.curiosity / 200.0
        {
            return;
        }
        let level = self.rng.gen::<f64>() * 0.5;
        aggregator.record_distortion(agent.id.clone(), agent.position, NodeCategory::Spatial, level);
    }

    fn maybe_sync(&mut self, i: usize, aggregator: &mut GlitchAggregator) {
        let agent = &self.agents[i];
        if self.agents.len() < 2 || self.rng.gen::<f64>() >= agent.social_affinity / 500.0 {
            return;
        }

        let mut participants = vec![(agent.id.clone(), agent.position)];
        for other in &self.agents {
            if participants.len() > MAX_SYNC_PARTNERS {
                break;
            }
            if other.id != agent.id && self.rng.gen::<f64>() < other.social_affinity / 100.0 {
                participants.push((other.id.clone(), other.position));
            }
        }
        if participants.len() < 2 {
            return;
        }

        let event = SyncEvent::from_positions(&participants, self.rng.gen::<f64>() * 0.8);
        aggregator.record_sync(&event.participants, event.midpoint, event.strength);
    }
}
