use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::sim_params::{FlockWeights, SimParams};
use crate::vecmath::AngleConversion;

// Configuration for the virtual world the swarm lives in
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub boundary: BoundaryPolicy,
    /// Distance from an edge at which the avoid policy starts steering.
    pub avoid_margin: f32,
}

/// What happens when a particle reaches the edge of the world.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Toroidal: leaving one edge re-enters at the opposite one.
    #[default]
    Wrap,
    /// Counter-steer inside the margin, hard clamp after integration.
    Avoid,
}

// Spatial partition settings
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GridConfig {
    pub cells_x: u32,
    pub cells_y: u32,
    pub max_objects_per_cell: u32,
}

/// Where new particles are placed on spawn and respawn.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPattern {
    /// Random x along the top edge (y = 0).
    #[default]
    TopEdge,
    /// Anywhere in the world.
    Uniform,
    /// All at the world centre.
    Center,
}

// Pool sizing and initial placement
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PopulationConfig {
    /// Fixed pool size; the active count never exceeds it.
    pub capacity: usize,
    pub initial_count: usize,
    pub seed: u64,
    pub spawn: SpawnPattern,
}

// Per-boid tuning
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct BoidParamsConfig {
    pub max_speed: f32,
    pub max_force: f32,
    pub desired_separation: f32,
    pub neighbor_radius: f32,
    pub mass_min: f32,
    pub mass_max: f32,
}

// A point force source
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AttractorConfig {
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    #[serde(alias = "g")]
    pub gravitational_constant: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default)]
    pub repulsor: bool,
    /// Rotates around `orbit_center` (or the world centre) every frame.
    #[serde(default)]
    pub orbit: bool,
    #[serde(default)]
    pub orbit_center: Option<[f32; 2]>,
    /// Mass and G ramp up and reset over time.
    #[serde(default)]
    pub oscillate: bool,
    /// Inactive until a gather event switches it on for a few frames.
    #[serde(default)]
    pub gather: bool,
}

// Time-driven parameter drift
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct DriftConfig {
    pub enabled: bool,
    pub count_interval_ms: u64,
    pub count_min: usize,
    pub count_max: usize,
    pub count_step: usize,
    pub speed_min: f32,
    pub speed_max: f32,
    pub speed_step: f32,
    pub attractor_interval_ms: u64,
    pub orbit_step_min: f32,
    pub orbit_step_max: f32,
    pub orbit_step_delta: f32,
    pub orbit_degrees_min: f32,
    pub orbit_degrees_max: f32,
    /// Draw `desired_separation` and `neighbor_radius` once at startup from
    /// `[radius_min, radius_max)` instead of taking them from `[boid]`.
    pub randomize_radii: bool,
    pub radius_min: f32,
    pub radius_max: f32,
}

// Random per-frame events
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct EventsConfig {
    /// Chance per frame that every active velocity is zeroed.
    pub freeze_chance: f32,
    /// Chance per frame that gather attractors switch on.
    pub gather_chance: f32,
    pub gather_frames_min: u32,
    pub gather_frames_max: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Run the per-particle compute phase on the rayon pool.
    pub parallel: bool,
    pub rotation_conversion: AngleConversion,
}

// Configuration for the frame loop of the binary
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TimingConfig {
    pub frames: u32,
    pub frame_period_ms: u64,
    pub record_interval_frames: u32,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_snapshots: bool,
    pub save_final_positions: bool,
    pub save_particles_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub boid: BoidParamsConfig,
    #[serde(default)]
    pub weights: FlockWeights,
    #[serde(default = "default_attractors")]
    pub attractors: Vec<AttractorConfig>,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would index outside the fixed pool or grid.
    pub fn validate(&self) -> Result<()> {
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            anyhow::bail!("world width and height must be positive.");
        }
        if self.grid.cells_x == 0 || self.grid.cells_y == 0 {
            anyhow::bail!("grid cells_x and cells_y must be greater than 0.");
        }
        if self.grid.max_objects_per_cell == 0 {
            anyhow::bail!("grid max_objects_per_cell must be greater than 0.");
        }
        let slots = self
            .grid
            .cells_x
            .checked_mul(self.grid.cells_y)
            .and_then(|cells| (cells as usize).checked_mul(self.grid.max_objects_per_cell as usize));
        if slots.is_none() {
            anyhow::bail!(
                "grid {}x{} cells with {} objects per cell is too large.",
                self.grid.cells_x,
                self.grid.cells_y,
                self.grid.max_objects_per_cell
            );
        }
        if self.population.capacity == 0 {
            anyhow::bail!("population capacity must be greater than 0.");
        }
        if self.population.initial_count > self.population.capacity {
            anyhow::bail!(
                "initial_count ({}) exceeds capacity ({}).",
                self.population.initial_count,
                self.population.capacity
            );
        }
        let drift = &self.drift;
        if drift.count_min > drift.count_max {
            anyhow::bail!("drift count_min must not exceed count_max.");
        }
        if drift.enabled && drift.count_max > self.population.capacity {
            anyhow::bail!("drift count_max ({}) exceeds capacity ({}).", drift.count_max, self.population.capacity);
        }
        for (name, min, max) in [
            ("speed", drift.speed_min, drift.speed_max),
            ("orbit_step", drift.orbit_step_min, drift.orbit_step_max),
            ("orbit_degrees", drift.orbit_degrees_min, drift.orbit_degrees_max),
            ("radius", drift.radius_min, drift.radius_max),
        ] {
            if !min.is_finite() || !max.is_finite() {
                anyhow::bail!("drift {}_min and {}_max must be finite.", name, name);
            }
            if min > max {
                anyhow::bail!("drift {}_min must not exceed {}_max.", name, name);
            }
        }
        if drift.randomize_radii && drift.radius_min <= 0.0 {
            anyhow::bail!("drift radius_min must be positive.");
        }
        if self.boid.max_speed <= 0.0 || self.boid.max_force <= 0.0 {
            anyhow::bail!("max_speed and max_force must be positive.");
        }
        if self.boid.mass_min <= 0.0 || self.boid.mass_min > self.boid.mass_max {
            anyhow::bail!("mass range must be positive with mass_min <= mass_max.");
        }
        for (i, a) in self.attractors.iter().enumerate() {
            if a.min_distance <= 0.0 || a.min_distance > a.max_distance {
                anyhow::bail!("attractor {}: need 0 < min_distance <= max_distance.", i);
            }
        }
        if self.events.gather_frames_min > self.events.gather_frames_max {
            anyhow::bail!("events gather_frames_min must not exceed gather_frames_max.");
        }

        if self.boid.desired_separation >= self.boid.neighbor_radius {
            warn!(
                "desired_separation ({}) >= neighbor_radius ({}); boids will rarely move apart.",
                self.boid.desired_separation, self.boid.neighbor_radius
            );
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            // World & Grid
            world_width: self.world.width,
            world_height: self.world.height,
            boundary: self.world.boundary,
            avoid_margin: self.world.avoid_margin,
            grid_cells_x: self.grid.cells_x,
            grid_cells_y: self.grid.cells_y,
            max_objects_per_cell: self.grid.max_objects_per_cell,
            // Population
            capacity: self.population.capacity,
            active_count: self.population.initial_count.min(self.population.capacity),
            spawn: self.population.spawn,
            // Boid kinematics
            max_speed: self.boid.max_speed,
            max_force: self.boid.max_force,
            desired_separation: self.boid.desired_separation,
            neighbor_radius: self.boid.neighbor_radius,
            mass_min: self.boid.mass_min,
            mass_max: self.boid.mass_max,
            weights: self.weights,
            // Events
            freeze_chance: self.events.freeze_chance,
            gather_chance: self.events.gather_chance,
            gather_frames_min: self.events.gather_frames_min,
            gather_frames_max: self.events.gather_frames_max,
            // Engine
            parallel: self.engine.parallel,
            rotation_conversion: self.engine.rotation_conversion,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            world: WorldConfig::default(),
            grid: GridConfig::default(),
            population: PopulationConfig::default(),
            boid: BoidParamsConfig::default(),
            weights: FlockWeights::default(),
            attractors: default_attractors(),
            drift: DriftConfig::default(),
            events: EventsConfig::default(),
            engine: EngineConfig::default(),
            timing: TimingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig { width: 48.0, height: 48.0, boundary: BoundaryPolicy::Wrap, avoid_margin: 8.0 }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { cells_x: 8, cells_y: 8, max_objects_per_cell: 6 }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        PopulationConfig { capacity: 60, initial_count: 50, seed: 42, spawn: SpawnPattern::TopEdge }
    }
}

impl Default for BoidParamsConfig {
    fn default() -> Self {
        BoidParamsConfig {
            max_speed: 1.8,
            max_force: 0.28,
            desired_separation: 3.0,
            neighbor_radius: 8.0,
            mass_min: 1.0,
            mass_max: 3.0,
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        DriftConfig {
            enabled: true,
            count_interval_ms: 8000,
            count_min: 25,
            count_max: 60,
            count_step: 5,
            speed_min: 0.9,
            speed_max: 2.8,
            speed_step: 0.1,
            attractor_interval_ms: 100,
            orbit_step_min: 1.0,
            orbit_step_max: 10.0,
            orbit_step_delta: 2.0,
            orbit_degrees_min: 1.0,
            orbit_degrees_max: 45.0,
            randomize_radii: false,
            radius_min: 3.0,
            radius_max: 5.0,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        EventsConfig { freeze_chance: 0.01, gather_chance: 0.005, gather_frames_min: 5, gather_frames_max: 25 }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { frames: 600, frame_period_ms: 16, record_interval_frames: 10 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "swarm".to_string(),
            save_snapshots: true,
            save_final_positions: true,
            save_particles_in_snapshot: true,
            format: None,
        }
    }
}

fn default_min_distance() -> f32 {
    15.0
}

fn default_max_distance() -> f32 {
    100.0
}

// A slowly orbiting, pulsing attractor plus a heavy gather point at the centre.
fn default_attractors() -> Vec<AttractorConfig> {
    vec![
        AttractorConfig {
            x: 42.0,
            y: 42.0,
            mass: 1.0,
            gravitational_constant: 0.1,
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            repulsor: false,
            orbit: true,
            orbit_center: Some([36.0, 36.0]),
            oscillate: true,
            gather: false,
        },
        AttractorConfig {
            x: 36.0,
            y: 36.0,
            mass: 100.0,
            gravitational_constant: 4.0,
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            repulsor: false,
            orbit: false,
            orbit_center: None,
            oscillate: false,
            gather: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.world.width, 48.0);
        assert_eq!(config.world.boundary, BoundaryPolicy::Wrap);
        assert_eq!(config.grid.max_objects_per_cell, 6);
        assert_eq!(config.population.capacity, 60);
        assert_eq!(config.attractors.len(), 2);
        assert_eq!(config.weights.separation, 3.5);
        assert_eq!(config.engine.rotation_conversion, AngleConversion::Single);
    }

    #[test]
    fn parses_sections_and_attractor_alias() {
        let text = r#"
            [world]
            width = 100.0
            height = 50.0
            boundary = "avoid"

            [grid]
            cells_x = 10
            cells_y = 5
            max_objects_per_cell = 4

            [population]
            capacity = 20
            initial_count = 10
            spawn = "uniform"

            [engine]
            parallel = true
            rotation_conversion = "double"

            [[attractors]]
            x = 50.0
            y = 25.0
            mass = 100.0
            g = 4.0
            repulsor = true
        "#;
        let mut text = text.to_string();
        // Drift bounds must fit the smaller pool.
        text.push_str("\n[drift]\ncount_min = 5\ncount_max = 20\n");
        let config = SimulationConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.world.boundary, BoundaryPolicy::Avoid);
        assert_eq!(config.population.spawn, SpawnPattern::Uniform);
        assert_eq!(config.attractors.len(), 1);
        let a = &config.attractors[0];
        assert_eq!(a.gravitational_constant, 4.0);
        assert_eq!(a.min_distance, 15.0);
        assert!(a.repulsor);
        assert!(!a.gather);

        let params = config.get_sim_params();
        assert_eq!(params.grid_cells_x, 10);
        assert_eq!(params.active_count, 10);
        assert!(params.parallel);
        assert_eq!(params.rotation_conversion, AngleConversion::Double);
    }

    #[test]
    fn rejects_initial_count_above_capacity() {
        let err = SimulationConfig::from_toml_str(
            "[population]\ncapacity = 5\ninitial_count = 6\n[drift]\nenabled = false\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_zero_grid_cells() {
        assert!(SimulationConfig::from_toml_str("[grid]\ncells_x = 0\n").is_err());
        assert!(SimulationConfig::from_toml_str("[grid]\nmax_objects_per_cell = 0\n").is_err());
    }

    #[test]
    fn rejects_drift_beyond_capacity() {
        let text = "[population]\ncapacity = 30\ninitial_count = 10\n";
        assert!(SimulationConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn rejects_inverted_attractor_distances() {
        let text = "[[attractors]]\nx = 1.0\ny = 1.0\nmass = 1.0\ng = 1.0\nmin_distance = 50.0\nmax_distance = 10.0\n";
        assert!(SimulationConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn rejects_inverted_drift_ranges_even_when_disabled() {
        let disabled = "[drift]\nenabled = false\nspeed_min = 3.0\nspeed_max = 1.0\n";
        assert!(SimulationConfig::from_toml_str(disabled).is_err());
        let count = "[drift]\nenabled = false\ncount_min = 40\ncount_max = 30\n";
        assert!(SimulationConfig::from_toml_str(count).is_err());
        let degrees = "[drift]\norbit_degrees_min = 50.0\norbit_degrees_max = 10.0\n";
        assert!(SimulationConfig::from_toml_str(degrees).is_err());
        let step = "[drift]\norbit_step_min = 12.0\norbit_step_max = 2.0\n";
        assert!(SimulationConfig::from_toml_str(step).is_err());
        let radius = "[drift]\nradius_min = 6.0\nradius_max = 4.0\n";
        assert!(SimulationConfig::from_toml_str(radius).is_err());
    }

    #[test]
    fn rejects_non_finite_drift_bounds() {
        let mut config = SimulationConfig::default();
        config.drift.speed_max = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.drift.orbit_degrees_max = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_grid() {
        let text = "[grid]\ncells_x = 100000\ncells_y = 100000\n";
        assert!(SimulationConfig::from_toml_str(text).is_err());
        let mut config = SimulationConfig::default();
        config.grid.cells_x = u32::MAX;
        config.grid.cells_y = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn set_active_count_clamps_to_capacity() {
        let mut params = SimulationConfig::default().get_sim_params();
        params.set_active_count(1000);
        assert_eq!(params.active_count, params.capacity);
    }
}
