use rand::Rng;
use swarm_common::{SimParams, SpawnPattern, Vec2};

use crate::boid::Boid;

/// Fixed-capacity particle pool.
///
/// Slots are never removed: shrinking the swarm disables the tail slots,
/// growing it respawns disabled ones. Enabled slots always form the prefix
/// `[0, active_count)`.
#[derive(Debug)]
pub struct SwarmState {
    // --- Ping-pong buffers for the compute phase ---
    /// Current frame (read-only while forces are computed).
    pub boids: Vec<Boid>,
    /// Written by the compute phase, swapped in on commit.
    pub next: Vec<Boid>,
    active_count: usize,
}

/// Picks a spawn point for `pattern` inside the world.
pub fn spawn_position<R: Rng + ?Sized>(params: &SimParams, rng: &mut R) -> Vec2 {
    match params.spawn {
        SpawnPattern::TopEdge => Vec2::new(rng.random_range(0.0..params.world_width), 0.0),
        SpawnPattern::Uniform => Vec2::new(
            rng.random_range(0.0..params.world_width),
            rng.random_range(0.0..params.world_height),
        ),
        SpawnPattern::Center => {
            let (cx, cy) = params.world_center();
            Vec2::new(cx, cy)
        }
    }
}

impl SwarmState {
    /// Allocates `params.capacity` slots once and enables the first `params.active_count`.
    pub fn new<R: Rng + ?Sized>(params: &SimParams, rng: &mut R) -> Self {
        let capacity = params.capacity;
        let active_count = params.active_count.min(capacity);
        let mut boids = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let mut boid = Boid::spawn(spawn_position(params, rng), rng, params);
            boid.enabled = i < active_count;
            boids.push(boid);
        }
        log::info!("Allocated particle pool: {} slots, {} active.", capacity, active_count);

        Self { next: boids.clone(), boids, active_count }
    }

    pub fn capacity(&self) -> usize {
        self.boids.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Enabled particles, in slot order.
    pub fn active(&self) -> impl Iterator<Item = &Boid> {
        self.boids.iter().filter(|b| b.enabled)
    }

    /// Brings the number of enabled slots to `target` (clamped to capacity).
    /// Newly enabled slots are respawned; the rest are disabled in place.
    pub fn sync_active_count<R: Rng + ?Sized>(&mut self, target: usize, params: &SimParams, rng: &mut R) {
        let target = target.min(self.capacity());
        if target == self.active_count {
            return;
        }
        log::debug!("Active particles {} -> {}", self.active_count, target);

        for (i, boid) in self.boids.iter_mut().enumerate() {
            if i < target {
                if !boid.enabled {
                    boid.respawn(spawn_position(params, rng), rng, params);
                }
            } else {
                boid.enabled = false;
            }
        }
        self.active_count = target;
    }

    /// Pushes runtime-tunable parameters into every enabled particle.
    pub fn apply_params(&mut self, params: &SimParams) {
        for boid in self.boids.iter_mut().filter(|b| b.enabled) {
            boid.max_speed = params.max_speed;
            boid.max_force = params.max_force;
            boid.desired_separation = params.desired_separation;
            boid.neighbor_radius = params.neighbor_radius;
        }
    }

    /// Zeroes the velocity of every enabled particle.
    pub fn freeze(&mut self) {
        for boid in self.boids.iter_mut().filter(|b| b.enabled) {
            boid.velocity = Vec2::zero();
        }
    }

    /// Makes the compute phase output the current frame.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.boids, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use swarm_common::SimulationConfig;

    fn setup() -> (SimParams, StdRng) {
        let params = SimulationConfig::default().get_sim_params();
        (params, StdRng::seed_from_u64(11))
    }

    #[test]
    fn new_pool_has_fixed_capacity() {
        let (params, mut rng) = setup();
        let state = SwarmState::new(&params, &mut rng);
        assert_eq!(state.capacity(), params.capacity);
        assert_eq!(state.next.len(), params.capacity);
        assert_eq!(state.active().count(), params.active_count);
        // Top-edge spawn
        assert!(state.active().all(|b| b.position.y == 0.0 && b.position.x < params.world_width));
    }

    #[test]
    fn shrinking_disables_instead_of_removing() {
        let (params, mut rng) = setup();
        let mut state = SwarmState::new(&params, &mut rng);
        let kept = state.boids[3];
        state.sync_active_count(10, &params, &mut rng);
        assert_eq!(state.capacity(), params.capacity);
        assert_eq!(state.active_count(), 10);
        assert_eq!(state.active().count(), 10);
        assert!(state.boids[..10].iter().all(|b| b.enabled));
        assert!(state.boids[10..].iter().all(|b| !b.enabled));
        // Surviving slots are untouched.
        assert_eq!(state.boids[3], kept);
    }

    #[test]
    fn growing_respawns_and_clamps_to_capacity() {
        let (params, mut rng) = setup();
        let mut state = SwarmState::new(&params, &mut rng);
        state.sync_active_count(5, &params, &mut rng);
        state.boids[20].position = Vec2::new(-99.0, -99.0);
        state.sync_active_count(usize::MAX, &params, &mut rng);
        assert_eq!(state.active_count(), params.capacity);
        assert!(state.boids.iter().all(|b| b.enabled));
        assert_eq!(state.boids[20].position.y, 0.0);
    }

    #[test]
    fn freeze_and_apply_params_touch_enabled_only() {
        let (mut params, mut rng) = setup();
        let mut state = SwarmState::new(&params, &mut rng);
        state.sync_active_count(4, &params, &mut rng);
        state.boids[10].velocity = Vec2::new(1.0, 1.0);
        state.boids[0].velocity = Vec2::new(1.0, 1.0);
        state.freeze();
        assert_eq!(state.boids[0].velocity, Vec2::zero());
        assert_eq!(state.boids[10].velocity, Vec2::new(1.0, 1.0));

        params.max_speed = 2.5;
        state.apply_params(&params);
        assert_eq!(state.boids[0].max_speed, 2.5);
        assert_ne!(state.boids[10].max_speed, 2.5);
    }

    #[test]
    fn center_spawn_uses_world_center() {
        let (mut params, mut rng) = setup();
        params.spawn = SpawnPattern::Center;
        let p = spawn_position(&params, &mut rng);
        assert_eq!(p, Vec2::new(24.0, 24.0));
    }
}
