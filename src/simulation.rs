use anyhow::Result;
use log::{debug, info, trace, warn};
use rand::distr::Uniform;
use rand::prelude::*;
use rayon::prelude::*;
use swarm_common::{BoundaryPolicy, FrameSnapshot, ParticleView, SimParams, SimulationConfig, Vec2};

use crate::attractor::Attractor;
use crate::boid::Boid;
use crate::drift::ParameterDrift;
use crate::grid::SpatialGrid;
use crate::swarm_state::SwarmState;

const MAX_EXPECTED_NEIGHBORS: usize = 20; // Histogram size; larger counts land in the last bin

/// Owns the particle pool, spatial grid, attractors and runtime parameters and
/// advances them one frame per [`SwarmSimulation::step`].
pub struct SwarmSimulation {
    /// The configuration the simulation was built from.
    pub config: SimulationConfig,
    /// Particle pool (current frame plus the compute-phase output buffer).
    pub state: SwarmState,
    params: SimParams,
    grid: SpatialGrid<usize>,
    attractors: Vec<Attractor>,
    drift: ParameterDrift,
    /// Drives spawning, drift and random events. Never touched by the compute phase.
    rng: StdRng,
    /// Neighbours within `neighbor_radius`, per slot, from the last compute phase.
    neighbor_counts: Vec<u32>,
    frame: u64,
    last_time_ms: u64,
    gather_frames_left: u32,
    recorded_snapshots: Vec<FrameSnapshot>,
}

impl SwarmSimulation {
    /// Validates `config`, allocates the pool and grid once and places the initial swarm.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut params = config.get_sim_params();
        let mut rng = StdRng::seed_from_u64(config.population.seed);
        if config.drift.enabled && config.drift.randomize_radii {
            let (min, max) = (config.drift.radius_min, config.drift.radius_max);
            let mut draw = || if min < max { rng.random_range(min..max) } else { min };
            params.desired_separation = draw();
            params.neighbor_radius = draw();
            debug!(
                "Drift radii: desired_separation={:.2} neighbor_radius={:.2}",
                params.desired_separation, params.neighbor_radius
            );
        }

        let state = SwarmState::new(&params, &mut rng);
        let grid = SpatialGrid::new(
            params.grid_cells_x,
            params.grid_cells_y,
            params.world_width,
            params.world_height,
            params.max_objects_per_cell,
        );
        let (cx, cy) = params.world_center();
        let attractors: Vec<Attractor> = config
            .attractors
            .iter()
            .map(|a| Attractor::from_config(a, Vec2::new(cx, cy), &mut rng))
            .collect();
        let drift = ParameterDrift::new(&config.drift, &params);

        info!(
            "Swarm initialized: {}/{} particles, world {}x{}, grid {} cells (max {} per cell), {} attractor(s), parallel={}",
            params.active_count,
            params.capacity,
            params.world_width,
            params.world_height,
            grid.num_cells(),
            params.max_objects_per_cell,
            attractors.len(),
            params.parallel
        );

        Ok(Self {
            neighbor_counts: vec![0; params.capacity],
            config,
            state,
            params,
            grid,
            attractors,
            drift,
            rng,
            frame: 0,
            last_time_ms: 0,
            gather_frames_left: 0,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Advances the swarm by one frame. `now_ms` is a monotonic clock used only
    /// for drift and attractor timing.
    pub fn step(&mut self, now_ms: u64) -> Result<()> {
        // --- 1. Drift and attractor motion ---
        let tick = self.drift.on_frame(now_ms, &mut self.params);
        for attractor in self.attractors.iter_mut() {
            if tick.oscillate && attractor.oscillates {
                attractor.oscillate_mass(&mut self.rng);
            }
            if let Some(center) = attractor.orbit_center {
                attractor.orbit(center, tick.orbit_degrees, self.params.rotation_conversion);
            }
        }

        // --- 2. Sync pool with the active count ---
        self.state.sync_active_count(self.params.active_count, &self.params, &mut self.rng);
        self.state.apply_params(&self.params);

        // --- 3. Rebuild the grid from the frame-start positions ---
        self.build_grid();

        // --- 4. Compute (read-only snapshot) ---
        self.compute_phase();

        // --- 5. Commit ---
        self.state.swap_buffers();

        // --- 6/7. Random events ---
        self.handle_events()?;

        self.frame += 1;
        self.last_time_ms = now_ms;
        trace!("Frame {} done at {} ms", self.frame, now_ms);
        Ok(())
    }

    fn build_grid(&mut self) {
        self.grid.clear();
        for (i, boid) in self.state.boids.iter().enumerate() {
            if boid.enabled {
                self.grid.insert(i, boid.position.x, boid.position.y);
            }
        }
        trace!("Grid rebuilt with {} particles", self.grid.len());
        let dropped = self.grid.dropped_inserts();
        if dropped > 0 {
            debug!("Frame {}: {} grid insert(s) dropped (cells full)", self.frame, dropped);
        }
    }

    fn compute_phase(&mut self) {
        let boids = &self.state.boids;
        let next = &mut self.state.next;
        let counts = &mut self.neighbor_counts;
        let grid = &self.grid;
        let attractors = &self.attractors;
        let params = &self.params;

        if params.parallel {
            next.par_iter_mut()
                .zip(counts.par_iter_mut())
                .enumerate()
                .for_each_init(Vec::new, |buf, (i, (out, count))| {
                    (*out, *count) = update_particle(i, boids, grid, attractors, params, buf);
                });
        } else {
            let mut buf = Vec::new();
            for (i, (out, count)) in next.iter_mut().zip(counts.iter_mut()).enumerate() {
                (*out, *count) = update_particle(i, boids, grid, attractors, params, &mut buf);
            }
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        let unit_dist = Uniform::new(0.0f32, 1.0f32)?;

        if self.rng.sample(unit_dist) < self.params.freeze_chance {
            debug!("Frame {}: freeze", self.frame);
            self.state.freeze();
        }

        if self.gather_frames_left > 0 {
            self.gather_frames_left -= 1;
            if self.gather_frames_left == 0 {
                self.set_gather_active(false);
            }
        } else if self.rng.sample(unit_dist) < self.params.gather_chance {
            let frames = self
                .rng
                .random_range(self.params.gather_frames_min..=self.params.gather_frames_max)
                .max(1);
            debug!("Frame {}: gather burst for {} frames", self.frame, frames);
            self.gather_frames_left = frames;
            self.set_gather_active(true);
        }
        Ok(())
    }

    fn set_gather_active(&mut self, active: bool) {
        for attractor in self.attractors.iter_mut().filter(|a| a.gathers) {
            attractor.active = active;
        }
    }

    /// Renderer hand-off for the current frame.
    pub fn snapshot(&self) -> FrameSnapshot {
        self.build_snapshot(true)
    }

    fn build_snapshot(&self, include_particles: bool) -> FrameSnapshot {
        let mut total_speed = 0.0;
        let mut active = 0u32;
        let mut particles = Vec::new();
        let mut neighbor_counts_distribution = vec![0u32; MAX_EXPECTED_NEIGHBORS];

        for (boid, &count) in self.state.boids.iter().zip(&self.neighbor_counts) {
            if !boid.enabled {
                continue;
            }
            active += 1;
            total_speed += boid.velocity.length();
            let bin = (count as usize).min(MAX_EXPECTED_NEIGHBORS - 1);
            neighbor_counts_distribution[bin] += 1;
            if include_particles {
                particles.push(ParticleView {
                    x: boid.position.x,
                    y: boid.position.y,
                    vx: boid.velocity.x,
                    vy: boid.velocity.y,
                    hue: boid.hue,
                    brightness: boid.brightness,
                });
            }
        }

        FrameSnapshot {
            frame: self.frame,
            time_ms: self.last_time_ms,
            active_count: active,
            attractors: self
                .attractors
                .iter()
                .filter(|a| a.active)
                .map(|a| (a.position.x, a.position.y))
                .collect(),
            dropped_inserts: self.grid.dropped_inserts(),
            average_speed: if active > 0 { total_speed / active as f32 } else { 0.0 },
            neighbor_counts_distribution,
            particles,
        }
    }

    /// Stores a snapshot of the current frame, with particles if the output
    /// config asks for them.
    pub fn record_snapshot(&mut self) {
        let snapshot = self.build_snapshot(self.config.output.save_particles_in_snapshot);

        let counted: u32 = snapshot.neighbor_counts_distribution.iter().sum();
        let overflow = snapshot.neighbor_counts_distribution.last().copied().unwrap_or(0);
        if overflow > 0 {
            warn!(
                "{} particle(s) with >= {} neighbours, counted in the last bin.",
                overflow,
                MAX_EXPECTED_NEIGHBORS - 1
            );
        }
        info!(
            "Frame {}: active={} avg_speed={:.3} dropped_inserts={} (histogram total {})",
            snapshot.frame, snapshot.active_count, snapshot.average_speed, snapshot.dropped_inserts, counted
        );
        self.recorded_snapshots.push(snapshot);
    }

    /// Positions of all enabled particles.
    pub fn get_results(&self) -> Vec<(f32, f32)> {
        self.state.active().map(|b| (b.position.x, b.position.y)).collect()
    }

    pub fn current_particle_count(&self) -> u32 {
        self.state.active().count() as u32
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Runtime parameters, e.g. to resize the swarm between frames.
    pub fn params_mut(&mut self) -> &mut SimParams {
        &mut self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn attractors(&self) -> &[Attractor] {
        &self.attractors
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn get_recorded_snapshots(&self) -> &Vec<FrameSnapshot> {
        &self.recorded_snapshots
    }
}

/// Computes the next state of slot `i` against the frame-start `boids`.
/// Returns the updated particle and its neighbour count. Disabled slots are
/// returned unchanged.
fn update_particle(
    i: usize,
    boids: &[Boid],
    grid: &SpatialGrid<usize>,
    attractors: &[Attractor],
    params: &SimParams,
    buf: &mut Vec<usize>,
) -> (Boid, u32) {
    let boid = boids[i];
    if !boid.enabled {
        return (boid, 0);
    }

    let radius = boid.neighbor_radius.max(boid.desired_separation);
    grid.query_neighbors_into(boid.position.x, boid.position.y, radius, buf);
    let neighbors = buf.iter().filter(|&&j| j != i).map(|&j| &boids[j]);

    let radius_sq = boid.neighbor_radius * boid.neighbor_radius;
    let neighbor_count = neighbors
        .clone()
        .filter(|other| {
            let d_sq = boid.position.distance_squared(other.position);
            other.enabled && d_sq > 0.0 && d_sq < radius_sq
        })
        .count() as u32;

    let mut next = boid;
    next.flock(neighbors, &params.weights);
    for attractor in attractors {
        next.apply_force(attractor.attract(&boid));
    }

    match params.boundary {
        BoundaryPolicy::Wrap => {
            next.integrate();
            next.wrap_around(params.world_width, params.world_height);
        }
        BoundaryPolicy::Avoid => {
            next.avoid_borders(params.world_width, params.world_height, params.avoid_margin);
            next.integrate();
            next.clamp_to_bounds(params.world_width, params.world_height);
        }
    }
    next.update_brightness();

    (next, neighbor_count)
}
