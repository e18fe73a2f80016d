//! Aggregator configuration
//!
//! Loaded from YAML; every field has a default, so a partial file (or no
//! file at all) is valid.

use crate::glitch::{GlitchError, GlitchResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bounds on the global intensity multiplier
pub const MIN_GLOBAL_INTENSITY: f64 = 0.5;
pub const MAX_GLOBAL_INTENSITY: f64 = 2.0;

/// Tunables of a `GlitchAggregator`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Mean cluster intensity that must be exceeded to spawn an emergent entity
    pub distortion_threshold: f64,
    /// Maximum number of live contribution nodes
    pub max_nodes: usize,
    /// Nodes older than this are evicted (ms)
    pub node_persistence_ms: u64,
    /// Starting global intensity multiplier
    pub global_intensity: f64,
    /// Reach and radius boost applied to entity interactions
    pub interaction_amplifier: f64,
    /// Seed for reproducible runs; drawn from entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            distortion_threshold: 0.65,
            max_nodes: 50,
            node_persistence_ms: 60_000,
            global_intensity: 1.0,
            interaction_amplifier: 1.2,
            rng_seed: None,
        }
    }
}

impl AggregatorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn validate(&self) -> GlitchResult<()> {
        if !self.distortion_threshold.is_finite() || !(0.0..=1.5).contains(&self.distortion_threshold) {
            return Err(GlitchError::InvalidConfig(
                "distortion_threshold must be within [0, 1.5]",
            ));
        }
        if self.max_nodes == 0 {
            return Err(GlitchError::InvalidConfig("max_nodes must be positive"));
        }
        if self.node_persistence_ms == 0 {
            return Err(GlitchError::InvalidConfig(
                "node_persistence_ms must be positive",
            ));
        }
        if !(MIN_GLOBAL_INTENSITY..=MAX_GLOBAL_INTENSITY).contains(&self.global_intensity) {
            return Err(GlitchError::InvalidConfig(
                "global_intensity must be within [0.5, 2.0]",
            ));
        }
        if !self.interaction_amplifier.is_finite() || self.interaction_amplifier <= 0.0 {
            return Err(GlitchError::InvalidConfig(
                "interaction_amplifier must be positive and finite",
            ));
        }
        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> GlitchResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> GlitchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> GlitchResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// `~/.config/glitchfield/config.yaml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("glitchfield").join("config.yaml"))
    }

    /// Load `path` if given, else the default path if it exists, else defaults
    pub fn load(path: Option<&Path>) -> GlitchResult<Self> {
        if let Some(path) = path {
            return Self::from_yaml_file(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::from_yaml_file(&default),
            _ => Ok(Self::default()),
        }
    }
}
