use crate::global_variables::{
    DEFAULT_CENTER_RADIUS, DEFAULT_INITIAL_DENSITY, DEFAULT_RADIAL_LENGTH, DEFAULT_RADIAL_ROADS,
    DEFAULT_REPORT_EVERY, DEFAULT_RING_ROADS, DEFAULT_SPAWN_PROBABILITY, DEFAULT_TICKS,
};
use crate::simulation_engine::error::{SimError, SimResult};
use crate::simulation_engine::grid::{LatticeBuilder, Topology};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What happens when a car reaches its destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityPolicy {
    /// The car is removed and nothing replaces it.
    #[default]
    Off,
    /// Right after the despawn phase, one car is spawned at a random free site
    /// for every car removed, keeping the live-car count constant.
    ImmediateRespawn,
}

/// Ring roads of the lattice, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingLayout {
    /// `count` single-lane rings.
    Uniform { count: usize },
    /// One ring per entry, with that many lanes.
    Gradual { lanes: Vec<usize> },
}

impl Default for RingLayout {
    fn default() -> Self {
        RingLayout::Uniform {
            count: DEFAULT_RING_ROADS,
        }
    }
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Radius of the innermost ring, in sites.
    pub center_radius: usize,
    pub radial_roads: usize,
    /// Length of one spoke segment between rings, in sites.
    pub radial_length: usize,
    pub rings: RingLayout,
    /// Expected cars spawned per tick; the fractional part is a probability.
    pub spawn_probability: f64,
    pub density_policy: DensityPolicy,
    pub initial_density: f64,
    pub seed: Option<u64>,
    pub ticks: u64,
    pub report_every: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            center_radius: DEFAULT_CENTER_RADIUS,
            radial_roads: DEFAULT_RADIAL_ROADS,
            radial_length: DEFAULT_RADIAL_LENGTH,
            rings: RingLayout::default(),
            spawn_probability: DEFAULT_SPAWN_PROBABILITY,
            density_policy: DensityPolicy::Off,
            initial_density: DEFAULT_INITIAL_DENSITY,
            seed: None,
            ticks: DEFAULT_TICKS,
            report_every: DEFAULT_REPORT_EVERY,
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON configuration; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path.as_ref())?;
        let config: SimulationConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn lattice_builder(&self) -> LatticeBuilder {
        let builder = LatticeBuilder::new(self.center_radius, self.radial_roads, self.radial_length);
        match &self.rings {
            RingLayout::Uniform { count } => builder.uniform(*count),
            RingLayout::Gradual { lanes } => builder.gradual(lanes),
        }
    }

    pub fn topology(&self) -> SimResult<Topology> {
        self.lattice_builder().build()
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.spawn_probability.is_finite() || self.spawn_probability < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "spawn probability must be a non-negative number, got {}",
                self.spawn_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_density) {
            return Err(SimError::InvalidConfig(format!(
                "initial density must lie in [0, 1], got {}",
                self.initial_density
            )));
        }
        if self.report_every == 0 {
            return Err(SimError::InvalidConfig("report_every must be positive".into()));
        }
        self.topology().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_reference_lattice() {
        let config = SimulationConfig::default();
        let topology = config.topology().unwrap();
        assert_eq!(topology.num_x(), 8);
        assert_eq!(topology.num_y(), 3);
        assert_eq!(topology.center_radius(), 10);
        assert_eq!(topology.radial_length(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{ "radial_roads": 12, "rings": { "gradual": { "lanes": [3, 2, 1] } },
                 "density_policy": "immediate_respawn", "seed": 42 }"#,
        )
        .unwrap();
        assert_eq!(config.radial_roads, 12);
        assert_eq!(config.center_radius, DEFAULT_CENTER_RADIUS);
        assert_eq!(config.rings, RingLayout::Gradual { lanes: vec![3, 2, 1] });
        assert_eq!(config.density_policy, DensityPolicy::ImmediateRespawn);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.topology().unwrap().ring_lanes(), &[3, 2, 1]);
    }

    #[test]
    fn rejects_out_of_range_knobs() {
        let mut config = SimulationConfig::default();
        config.spawn_probability = -0.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.spawn_probability = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.initial_density = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.radial_roads = 1;
        assert!(config.validate().is_err());
    }
}
