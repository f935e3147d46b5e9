use rand::Rng;
use swarm_common::fast_math::fast_sqrt;
use swarm_common::{clamp, FlockWeights, SimParams, Vec2};

// Floor for the 1/d separation weight so coincident-but-not-equal
// positions stay finite.
const MIN_SEPARATION_WEIGHT_DISTANCE: f32 = 1e-3;

/// A single flocking particle.
///
/// Updated once per frame: forces accumulate into `acceleration`, then
/// [`Boid::integrate`] applies them and resets the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boid {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub max_speed: f32,
    pub max_force: f32,
    pub mass: f32,
    /// Radius inside which separation pushes neighbours away.
    pub desired_separation: f32,
    /// Radius for alignment and cohesion.
    pub neighbor_radius: f32,
    pub enabled: bool,
    pub hue: u8,
    pub brightness: u8,
}

impl Boid {
    /// Creates an enabled boid with the given kinematics and tuning from `params`.
    pub fn new(position: Vec2, velocity: Vec2, params: &SimParams) -> Self {
        Boid {
            position,
            velocity,
            acceleration: Vec2::zero(),
            max_speed: params.max_speed,
            max_force: params.max_force,
            mass: params.mass_min,
            desired_separation: params.desired_separation,
            neighbor_radius: params.neighbor_radius,
            enabled: true,
            hue: 128,
            brightness: 255,
        }
    }

    /// Creates an enabled boid at `position` with randomized velocity, mass and hue.
    pub fn spawn<R: Rng + ?Sized>(position: Vec2, rng: &mut R, params: &SimParams) -> Self {
        let mut boid = Boid::new(position, Vec2::zero(), params);
        boid.respawn(position, rng, params);
        boid
    }

    /// Reinitializes this slot in place: each velocity axis in [-0.5, 0.5],
    /// mass in `[mass_min, mass_max)`, hue in 10..=255.
    pub fn respawn<R: Rng + ?Sized>(&mut self, position: Vec2, rng: &mut R, params: &SimParams) {
        self.position = position;
        self.velocity = Vec2::new(rng.random_range(-0.5..=0.5), rng.random_range(-0.5..=0.5));
        self.acceleration = Vec2::zero();
        self.max_speed = params.max_speed;
        self.max_force = params.max_force;
        self.mass = if params.mass_max > params.mass_min {
            rng.random_range(params.mass_min..params.mass_max)
        } else {
            params.mass_min
        };
        self.desired_separation = params.desired_separation;
        self.neighbor_radius = params.neighbor_radius;
        self.enabled = true;
        self.hue = rng.random_range(10..=255);
        self.brightness = 255;
    }

    /// Accumulates a force. Mass is not divided out.
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    /// Steer away from neighbours closer than `desired_separation`, weighting
    /// closer ones more. Zero when nobody is that close.
    pub fn separate<'a, I>(&self, neighbors: I) -> Vec2
    where
        I: IntoIterator<Item = &'a Boid>,
    {
        let sep_sq = self.desired_separation * self.desired_separation;
        let mut steer = Vec2::zero();
        let mut count = 0u32;

        for other in neighbors {
            if !other.enabled {
                continue;
            }
            let diff = self.position - other.position;
            let d_sq = diff.length_squared();
            // d > 0 excludes self and exactly coincident particles
            if d_sq > 0.0 && d_sq < sep_sq {
                let d = fast_sqrt(d_sq).max(MIN_SEPARATION_WEIGHT_DISTANCE);
                steer += diff.normalize() / d;
                count += 1;
            }
        }
        if count > 0 {
            steer /= count as f32;
        }

        if steer.length_squared() > 0.0 {
            // Reynolds: steering = desired - velocity
            (steer.normalize() * self.max_speed - self.velocity).limit(self.max_force)
        } else {
            steer
        }
    }

    /// Steer toward the average heading of neighbours within `neighbor_radius`.
    pub fn align<'a, I>(&self, neighbors: I) -> Vec2
    where
        I: IntoIterator<Item = &'a Boid>,
    {
        let radius_sq = self.neighbor_radius * self.neighbor_radius;
        let mut sum = Vec2::zero();
        let mut count = 0u32;

        for other in neighbors {
            if !other.enabled {
                continue;
            }
            let d_sq = self.position.distance_squared(other.position);
            if d_sq > 0.0 && d_sq < radius_sq {
                sum += other.velocity;
                count += 1;
            }
        }
        if count == 0 {
            return Vec2::zero();
        }

        let desired = (sum / count as f32).normalize() * self.max_speed;
        (desired - self.velocity).limit(self.max_force)
    }

    /// Steer toward the centroid of neighbours within `neighbor_radius`.
    pub fn cohesion<'a, I>(&self, neighbors: I) -> Vec2
    where
        I: IntoIterator<Item = &'a Boid>,
    {
        let radius_sq = self.neighbor_radius * self.neighbor_radius;
        let mut sum = Vec2::zero();
        let mut count = 0u32;

        for other in neighbors {
            if !other.enabled {
                continue;
            }
            let d_sq = self.position.distance_squared(other.position);
            if d_sq > 0.0 && d_sq < radius_sq {
                sum += other.position;
                count += 1;
            }
        }
        if count == 0 {
            return Vec2::zero();
        }
        self.seek(sum / count as f32)
    }

    /// Steering toward `target` at full speed, limited to `max_force`.
    /// Zero when already at the target.
    pub fn seek(&self, target: Vec2) -> Vec2 {
        let desired = target - self.position;
        if desired.length_squared() > 0.0 {
            (desired.normalize() * self.max_speed - self.velocity).limit(self.max_force)
        } else {
            Vec2::zero()
        }
    }

    /// Like [`Boid::seek`], but the desired speed falls off linearly inside
    /// `slowing_radius` so the boid comes to rest on the target.
    pub fn arrive(&self, target: Vec2, slowing_radius: f32) -> Vec2 {
        let desired = target - self.position;
        let d = desired.length();
        if d <= 0.0 {
            return Vec2::zero();
        }
        let speed = if d < slowing_radius { self.max_speed * d / slowing_radius } else { self.max_speed };
        (desired.normalize() * speed - self.velocity).limit(self.max_force)
    }

    /// Pushes away from `obstacle` when the position one step ahead lies within
    /// `radius` of it. Closer means stronger, up to twice `max_force`.
    pub fn repel_force(&self, obstacle: Vec2, radius: f32) -> Vec2 {
        let d = (obstacle - (self.position + self.velocity)).length();
        if d > radius {
            return Vec2::zero();
        }
        let away = (self.position - obstacle).normalize();
        let steer = if d > 0.0 { away * (self.max_speed / d) - self.velocity } else { away };
        steer.limit(self.max_force * 2.0)
    }

    /// Weighted sum of separation, alignment and cohesion.
    pub fn flocking_force<'a, I>(&self, neighbors: I, weights: &FlockWeights) -> Vec2
    where
        I: IntoIterator<Item = &'a Boid> + Clone,
    {
        let sep = self.separate(neighbors.clone());
        let ali = self.align(neighbors.clone());
        let coh = self.cohesion(neighbors);
        sep * weights.separation + ali * weights.alignment + coh * weights.cohesion
    }

    /// Accumulates the weighted flocking force.
    pub fn flock<'a, I>(&mut self, neighbors: I, weights: &FlockWeights)
    where
        I: IntoIterator<Item = &'a Boid> + Clone,
    {
        let force = self.flocking_force(neighbors, weights);
        self.apply_force(force);
    }

    /// velocity += acceleration, clamp to `max_speed`, move, reset acceleration.
    pub fn integrate(&mut self) {
        self.velocity += self.acceleration;
        self.velocity = self.velocity.limit(self.max_speed);
        self.position += self.velocity;
        self.acceleration = Vec2::zero();
    }

    /// Toroidal boundary: leaving one edge re-enters at the opposite one.
    pub fn wrap_around(&mut self, width: f32, height: f32) {
        if self.position.x < 0.0 {
            self.position.x += width;
        }
        if self.position.y < 0.0 {
            self.position.y += height;
        }
        if self.position.x >= width {
            self.position.x -= width;
        }
        if self.position.y >= height {
            self.position.y -= height;
        }
    }

    /// Counter-steers away from any edge closer than `margin`. Each axis is
    /// handled on its own so corners push diagonally.
    pub fn avoid_borders(&mut self, width: f32, height: f32, margin: f32) {
        let mut desired = self.velocity;

        if self.position.x < margin {
            desired.x = self.max_speed;
        } else if self.position.x >= width - margin {
            desired.x = -self.max_speed;
        }
        if self.position.y < margin {
            desired.y = self.max_speed;
        } else if self.position.y >= height - margin {
            desired.y = -self.max_speed;
        }

        if desired != self.velocity {
            let steer = (desired - self.velocity).limit(self.max_force);
            self.apply_force(steer);
        }
    }

    /// Hard clamp used after integration by the avoid policy. Coordinates are
    /// virtual pixels, so the far edge clamps to the last pixel.
    pub fn clamp_to_bounds(&mut self, width: f32, height: f32) {
        if self.position.x < 0.0 {
            self.position.x = 0.0;
        }
        if self.position.y < 0.0 {
            self.position.y = 0.0;
        }
        if self.position.x >= width {
            self.position.x = (width - 1.0).max(0.0);
        }
        if self.position.y >= height {
            self.position.y = (height - 1.0).max(0.0);
        }
    }

    /// Brightness from `vx + vy`, mapped linearly from [0, 5] onto [50, 255].
    pub fn update_brightness(&mut self) {
        let s = self.velocity.x + self.velocity.y;
        let mapped = 50.0 + s * (255.0 - 50.0) / 5.0;
        self.brightness = clamp(mapped, 50.0, 255.0) as u8;
    }
}
