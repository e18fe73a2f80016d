//! Category vocabulary and the static lookup tables keyed on it
//!
//! Node categories are the fixed tags a source can report. Glitch
//! categories add the compound kinds that emerge from clusters and
//! interactions. Colors, effect descriptors, interaction children and
//! emergent derivation are all pure functions of these enums.

use crate::geometry::Rgb;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category of a contribution node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Spatial,
    Temporal,
    Dream,
    Sync,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Spatial,
        NodeCategory::Temporal,
        NodeCategory::Dream,
        NodeCategory::Sync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spatial => "spatial",
            Self::Temporal => "temporal",
            Self::Dream => "dream",
            Self::Sync => "sync",
        }
    }

    pub fn color(&self) -> Rgb {
        GlitchCategory::Base(*self).color()
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown node category: {}", s))
    }
}

/// Category of a glitch entity.
///
/// Serialized as a snake_case string: `"spatial"`, `"spacetime_rift"`,
/// `"dream_cascade"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GlitchCategory {
    /// A plain node category (user entities may carry one)
    Base(NodeCategory),
    /// Every node in the spawning cluster shared this category
    Cascade(NodeCategory),
    SpacetimeRift,
    VoidTear,
    ChronoFracture,
    DreamEruption,
    CollectiveDreamscape,
    ConsciousnessNexus,
    TimeEcho,
    RealityBleed,
    DimensionalShift,
    DreamWarp,
    TimeFracture,
    CollectiveDream,
    LucidRupture,
    DreamRupture,
    ConsciousnessConvergence,
    RealityAnomaly,
    ChaosPulse,
}

const NAMED: [(GlitchCategory, &str); 17] = [
    (GlitchCategory::SpacetimeRift, "spacetime_rift"),
    (GlitchCategory::VoidTear, "void_tear"),
    (GlitchCategory::ChronoFracture, "chrono_fracture"),
    (GlitchCategory::DreamEruption, "dream_eruption"),
    (GlitchCategory::CollectiveDreamscape, "collective_dreamscape"),
    (GlitchCategory::ConsciousnessNexus, "consciousness_nexus"),
    (GlitchCategory::TimeEcho, "time_echo"),
    (GlitchCategory::RealityBleed, "reality_bleed"),
    (GlitchCategory::DimensionalShift, "dimensional_shift"),
    (GlitchCategory::DreamWarp, "dream_warp"),
    (GlitchCategory::TimeFracture, "time_fracture"),
    (GlitchCategory::CollectiveDream, "collective_dream"),
    (GlitchCategory::LucidRupture, "lucid_rupture"),
    (GlitchCategory::DreamRupture, "dream_rupture"),
    (GlitchCategory::ConsciousnessConvergence, "consciousness_convergence"),
    (GlitchCategory::RealityAnomaly, "reality_anomaly"),
    (GlitchCategory::ChaosPulse, "chaos_pulse"),
];

impl GlitchCategory {
    /// Display color for this category
    pub fn color(&self) -> Rgb {
        use GlitchCategory::*;
        let hex = match self {
            Base(NodeCategory::Spatial) => 0xFF4500,
            Base(NodeCategory::Temporal) => 0x00FF7F,
            Base(NodeCategory::Dream) => 0x8A2BE2,
            Base(NodeCategory::Sync) => 0x00CED1,
            SpacetimeRift => 0xFF1493,
            VoidTear => 0xFF4500,
            ChronoFracture => 0x00FA9A,
            DreamEruption => 0x9400D3,
            CollectiveDreamscape => 0x9932CC,
            ConsciousnessNexus => 0x4682B4,
            TimeEcho => 0x20B2AA,
            RealityBleed => 0xFF6347,
            RealityAnomaly => 0xFFD700,
            DimensionalShift => 0xFF69B4,
            DreamWarp => 0xBA55D3,
            LucidRupture => 0xDDA0DD,
            ChaosPulse => 0xFF00FF,
            Cascade(_) | TimeFracture | CollectiveDream | DreamRupture
            | ConsciousnessConvergence => return Rgb::WHITE,
        };
        Rgb::from_hex(hex)
    }

    /// Side-effect descriptors an entity of this category carries
    pub fn effects(&self) -> Vec<Effect> {
        use EffectKind::*;
        use GlitchCategory::*;
        let table: &[(EffectKind, f64)] = match self {
            SpacetimeRift => &[(TemporalDistortion, 0.8), (RealityBlur, 0.7)],
            VoidTear => &[(RealityBlur, 0.9), (MemoryLeak, 0.4)],
            ChronoFracture => &[(TemporalDistortion, 1.0), (MemoryLeak, 0.6)],
            DreamEruption => &[(DreamManifestation, 0.9), (RealityBlur, 0.5)],
            CollectiveDreamscape => &[(DreamManifestation, 1.0), (TemporalDistortion, 0.3)],
            ConsciousnessNexus => &[(MemoryLeak, 0.8), (DreamManifestation, 0.5)],
            TimeEcho => &[(TemporalDistortion, 0.7), (MemoryLeak, 0.7)],
            RealityBleed => &[(RealityBlur, 0.8), (DreamManifestation, 0.6)],
            DimensionalShift => &[(RealityBlur, 0.7), (EffectKind::ChaosPulse, 0.5)],
            DreamWarp => &[(DreamManifestation, 0.8), (TemporalDistortion, 0.6)],
            LucidRupture => &[(DreamManifestation, 1.2), (EffectKind::ChaosPulse, 0.7)],
            GlitchCategory::ChaosPulse => &[(RealityBlur, 0.6)],
            _ => &[(RealityBlur, 0.5)],
        };
        table
            .iter()
            .map(|&(kind, strength)| Effect { kind, strength })
            .collect()
    }

    /// Whether dream manifestations may spring from this category
    pub fn is_dreamlike(&self) -> bool {
        matches!(
            self,
            GlitchCategory::Base(NodeCategory::Dream)
                | GlitchCategory::DreamEruption
                | GlitchCategory::CollectiveDreamscape
                | GlitchCategory::LucidRupture
        )
    }

    /// The child category two interacting entities produce, if any.
    ///
    /// Symmetric: `interaction_child(a, b) == interaction_child(b, a)`.
    pub fn interaction_child(a: GlitchCategory, b: GlitchCategory) -> Option<GlitchCategory> {
        use NodeCategory::*;
        let (GlitchCategory::Base(a), GlitchCategory::Base(b)) = (a, b) else {
            return None;
        };
        match (a, b) {
            (Dream, Spatial) | (Spatial, Dream) => Some(GlitchCategory::RealityBleed),
            (Temporal, Temporal) => Some(GlitchCategory::TimeFracture),
            (Sync, Dream) | (Dream, Sync) => Some(GlitchCategory::CollectiveDream),
            (Spatial, Sync) | (Sync, Spatial) => Some(GlitchCategory::DimensionalShift),
            (Dream, Temporal) | (Temporal, Dream) => Some(GlitchCategory::DreamWarp),
            _ => None,
        }
    }

    /// Derive the category of an emergent entity from its cluster's node
    /// categories.
    ///
    /// Pair combinations take precedence in a fixed order, then a uniform
    /// cluster becomes a cascade, then the dominant category picks a
    /// fallback. Returns `RealityAnomaly` for an empty slice.
    pub fn emergent(categories: &[NodeCategory]) -> GlitchCategory {
        use NodeCategory::*;
        let Some(dominant) = dominant(categories) else {
            return GlitchCategory::RealityAnomaly;
        };
        let has = |a: NodeCategory, b: NodeCategory| {
            categories.contains(&a) && categories.contains(&b)
        };

        const PRECEDENCE: [(NodeCategory, NodeCategory, GlitchCategory); 6] = [
            (Spatial, Temporal, GlitchCategory::SpacetimeRift),
            (Dream, Sync, GlitchCategory::CollectiveDreamscape),
            (Temporal, Sync, GlitchCategory::TimeEcho),
            (Spatial, Dream, GlitchCategory::RealityBleed),
            (Spatial, Sync, GlitchCategory::DimensionalShift),
            (Dream, Temporal, GlitchCategory::DreamWarp),
        ];
        if let Some((_, _, category)) = PRECEDENCE.iter().find(|(a, b, _)| has(*a, *b)) {
            return *category;
        }

        if categories.iter().all(|c| *c == dominant) {
            return GlitchCategory::Cascade(dominant);
        }

        match dominant {
            Spatial => GlitchCategory::VoidTear,
            Temporal => GlitchCategory::ChronoFracture,
            Dream => GlitchCategory::DreamEruption,
            Sync => GlitchCategory::ConsciousnessNexus,
        }
    }
}

/// Most frequent category; ties go to the earlier declaration.
fn dominant(categories: &[NodeCategory]) -> Option<NodeCategory> {
    let mut best: Option<(NodeCategory, usize)> = None;
    for candidate in NodeCategory::ALL {
        let count = categories.iter().filter(|c| **c == candidate).count();
        if count > 0 && best.map_or(true, |(_, n)| count > n) {
            best = Some((candidate, count));
        }
    }
    best.map(|(c, _)| c)
}

impl std::fmt::Display for GlitchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlitchCategory::Base(c) => write!(f, "{}", c),
            GlitchCategory::Cascade(c) => write!(f, "{}_cascade", c),
            named => {
                let name = NAMED
                    .iter()
                    .find(|(c, _)| c == named)
                    .map(|(_, n)| *n)
                    .unwrap_or("reality_anomaly");
                f.write_str(name)
            }
        }
    }
}

impl FromStr for GlitchCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((category, _)) = NAMED.iter().find(|(_, n)| *n == s) {
            return Ok(*category);
        }
        if let Some(base) = s.strip_suffix("_cascade") {
            return base.parse().map(GlitchCategory::Cascade);
        }
        s.parse::<NodeCategory>()
            .map(GlitchCategory::Base)
            .map_err(|_| format!("unknown glitch category: {}", s))
    }
}

impl From<NodeCategory> for GlitchCategory {
    fn from(c: NodeCategory) -> Self {
        GlitchCategory::Base(c)
    }
}

impl TryFrom<String> for GlitchCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GlitchCategory> for String {
    fn from(c: GlitchCategory) -> Self {
        c.to_string()
    }
}

/// Kinds of downstream side effect an entity can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    TemporalDistortion,
    RealityBlur,
    MemoryLeak,
    DreamManifestation,
    ChaosPulse,
}

/// An effect descriptor: what to emit and how strongly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    pub strength: f64,
}
