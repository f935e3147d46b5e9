use serde::{Deserialize, Serialize};

/// Renderer-facing state of one enabled particle after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    /// Velocity is exported for speed-derived effects on the renderer side.
    pub vx: f32,
    pub vy: f32,
    pub hue: u8,
    pub brightness: u8,
}

/// A snapshot of the swarm at the end of one frame.
#[derive(Debug, Clone, Serialize, Deserialize)] // Derive traits for easy saving/loading
pub struct FrameSnapshot {
    /// Frame number (number of completed steps).
    pub frame: u64,
    /// Time source value (ms) passed to the step that produced this frame.
    pub time_ms: u64,
    /// Number of enabled particles.
    pub active_count: u32,
    /// Positions of the attractors that were active this frame.
    pub attractors: Vec<(f32, f32)>,
    /// Inserts dropped because their grid cell was full.
    pub dropped_inserts: u32,
    pub average_speed: f32,
    /// `neighbor_counts_distribution[N]` is the number of particles with exactly N
    /// neighbours inside their neighbour radius; the last bin collects the rest.
    pub neighbor_counts_distribution: Vec<u32>,
    /// Per-particle state; empty when only metrics are recorded.
    pub particles: Vec<ParticleView>,
}
