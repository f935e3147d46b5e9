pub mod config;
pub mod fast_math;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    AttractorConfig, BoidParamsConfig, BoundaryPolicy, DriftConfig, EngineConfig, EventsConfig, GridConfig,
    OutputConfig, PopulationConfig, SimulationConfig, SpawnPattern, TimingConfig, WorldConfig,
};
pub use sim_params::{FlockWeights, SimParams};
pub use snapshot::{FrameSnapshot, ParticleView};
pub use vecmath::{clamp, AngleConversion, Vec2};
