use serde::{Deserialize, Serialize};

use crate::config::{BoundaryPolicy, SpawnPattern};
use crate::vecmath::AngleConversion;

/// Relative blend of the three flocking rules.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockWeights {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
}

impl Default for FlockWeights {
    fn default() -> Self {
        FlockWeights { separation: 3.5, alignment: 1.0, cohesion: 1.0 }
    }
}

/// Simulation parameters derived from the configuration, owned by the simulation
/// step and mutated between frames (swarm size, speed and radii drift).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // World & Grid
    pub world_width: f32,
    pub world_height: f32,
    pub boundary: BoundaryPolicy,
    pub avoid_margin: f32,
    pub grid_cells_x: u32,
    pub grid_cells_y: u32,
    pub max_objects_per_cell: u32,

    // Population
    pub capacity: usize,
    pub active_count: usize,
    pub spawn: SpawnPattern,

    // Boid kinematics
    pub max_speed: f32,
    pub max_force: f32,
    pub desired_separation: f32,
    pub neighbor_radius: f32,
    pub mass_min: f32,
    pub mass_max: f32,
    pub weights: FlockWeights,

    // Events
    pub freeze_chance: f32,
    pub gather_chance: f32,
    pub gather_frames_min: u32,
    pub gather_frames_max: u32,

    // Engine
    pub parallel: bool,
    pub rotation_conversion: AngleConversion,
}

impl SimParams {
    /// Sets the active particle count, clamped to the fixed pool capacity.
    pub fn set_active_count(&mut self, count: usize) {
        self.active_count = count.min(self.capacity);
    }

    /// Centre of the world, used as the default orbit centre.
    pub fn world_center(&self) -> (f32, f32) {
        (self.world_width * 0.5, self.world_height * 0.5)
    }
}
