use rand::Rng;
use swarm_common::{AngleConversion, AttractorConfig, Vec2};

use crate::boid::Boid;

const G_MIN: f32 = 0.5;
const G_MAX: f32 = 4.0;
const G_STEP: f32 = 0.5;

// Mass ramp state: hold at mass 1 for `hold_wait` ticks, then grow by 1/8 per
// tick until `ceiling`, then reset and draw new hold/ceiling values.
#[derive(Debug, Clone)]
struct MassRamp {
    hold_ticks: u32,
    hold_wait: u32,
    ceiling: f32,
    g_dir: f32,
}

impl MassRamp {
    fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        MassRamp {
            hold_ticks: 0,
            hold_wait: rng.random_range(5..20),
            ceiling: rng.random_range(20..800) as f32,
            g_dir: 1.0,
        }
    }
}

/// Point force source pulling (or pushing) particles by an inverse-square law.
#[derive(Debug, Clone)]
pub struct Attractor {
    pub position: Vec2,
    pub mass: f32,
    pub gravitational_constant: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub is_repulsor: bool,
    /// Inactive attractors contribute no force.
    pub active: bool,
    /// Centre the attractor orbits around each frame, if any.
    pub orbit_center: Option<Vec2>,
    pub oscillates: bool,
    /// Only switched on by gather events.
    pub gathers: bool,
    ramp: MassRamp,
}

impl Attractor {
    pub fn new(position: Vec2, mass: f32, gravitational_constant: f32, min_distance: f32, max_distance: f32) -> Self {
        Attractor {
            position,
            mass,
            gravitational_constant,
            min_distance,
            max_distance,
            is_repulsor: false,
            active: true,
            orbit_center: None,
            oscillates: false,
            gathers: false,
            ramp: MassRamp { hold_ticks: 0, hold_wait: 5, ceiling: 20.0, g_dir: 1.0 },
        }
    }

    /// Builds an attractor from its config entry. Orbiting attractors without an
    /// explicit centre orbit around `world_center`. Gather attractors start inactive.
    pub fn from_config<R: Rng + ?Sized>(config: &AttractorConfig, world_center: Vec2, rng: &mut R) -> Self {
        let mut attractor = Attractor::new(
            Vec2::new(config.x, config.y),
            config.mass,
            config.gravitational_constant,
            config.min_distance,
            config.max_distance,
        );
        attractor.is_repulsor = config.repulsor;
        attractor.active = !config.gather;
        attractor.orbit_center = config
            .orbit
            .then(|| config.orbit_center.map(|[x, y]| Vec2::new(x, y)).unwrap_or(world_center));
        attractor.oscillates = config.oscillate;
        attractor.gathers = config.gather;
        attractor.ramp = MassRamp::new(rng);
        attractor
    }

    /// Force exerted on `boid`: `G * m1 * m2 / d²` along the direction to the
    /// attractor, with `d` clamped into `[min_distance, max_distance]`.
    /// Negated for repulsors, zero when inactive or coincident.
    pub fn attract(&self, boid: &Boid) -> Vec2 {
        if !self.active {
            return Vec2::zero();
        }
        let dir = self.position - boid.position;
        if dir.length_squared() == 0.0 {
            return Vec2::zero();
        }
        let d = dir.fast_length().clamp(self.min_distance, self.max_distance);
        let strength = (self.gravitational_constant * self.mass * boid.mass) / (d * d);
        let force = dir.fast_normalize() * strength;
        if self.is_repulsor {
            -force
        } else {
            force
        }
    }

    /// One tick of the mass/G oscillation.
    pub fn oscillate_mass<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let ramp = &mut self.ramp;
        if ramp.hold_ticks > ramp.hold_wait {
            self.mass += self.mass / 8.0;
            self.gravitational_constant += G_STEP * ramp.g_dir;
            if self.gravitational_constant > G_MAX || self.gravitational_constant < G_MIN {
                ramp.g_dir = -ramp.g_dir;
            }
        }
        if self.mass > ramp.ceiling {
            ramp.hold_ticks = 0;
            self.mass = 1.0;
            ramp.hold_wait = rng.random_range(2..50);
            ramp.ceiling = rng.random_range(300..400) as f32;
        }
        if self.mass == 1.0 {
            ramp.hold_ticks += 1;
        }
    }

    /// Rotates the position around `center` by `degrees`.
    pub fn orbit(&mut self, center: Vec2, degrees: f32, conversion: AngleConversion) {
        self.position = self.position.rotate_around_point_with(center, degrees, conversion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use swarm_common::SimulationConfig;

    fn particle(x: f32, y: f32, mass: f32) -> Boid {
        let params = SimulationConfig::default().get_sim_params();
        let mut b = Boid::new(Vec2::new(x, y), Vec2::zero(), &params);
        b.mass = mass;
        b
    }

    #[test]
    fn attract_points_toward_attractor() {
        let a = Attractor::new(Vec2::new(50.0, 50.0), 100.0, 4.0, 15.0, 100.0);
        let p = particle(10.0, 10.0, 2.0);
        let force = a.attract(&p);
        assert!(force.dot(a.position - p.position) > 0.0);
        // d = sqrt(3200) ≈ 56.6, inside the clamp range
        let expected = 4.0 * 100.0 * 2.0 / 3200.0;
        assert!((force.length() - expected).abs() < expected * 0.02);
    }

    #[test]
    fn repulsor_negates_force() {
        let mut a = Attractor::new(Vec2::new(50.0, 50.0), 100.0, 4.0, 15.0, 100.0);
        let p = particle(10.0, 10.0, 2.0);
        let pull = a.attract(&p);
        a.is_repulsor = true;
        let push = a.attract(&p);
        assert!((pull + push).length() < 1e-6);
        assert!(push.dot(a.position - p.position) < 0.0);
    }

    #[test]
    fn distance_is_clamped() {
        let a = Attractor::new(Vec2::new(0.0, 0.0), 10.0, 1.0, 15.0, 100.0);
        // Very close: treated as min_distance
        let near = a.attract(&particle(0.5, 0.0, 1.0));
        assert!((near.length() - 10.0 / 225.0).abs() < 1e-3);
        // Far beyond max: treated as max_distance, still a weak pull
        let far = a.attract(&particle(500.0, 0.0, 1.0));
        assert!((far.length() - 10.0 / 10_000.0).abs() < 1e-5);
        assert!(far.x < 0.0);
    }

    #[test]
    fn inactive_or_coincident_gives_zero() {
        let mut a = Attractor::new(Vec2::new(5.0, 5.0), 10.0, 1.0, 15.0, 100.0);
        assert_eq!(a.attract(&particle(5.0, 5.0, 1.0)), Vec2::zero());
        a.active = false;
        assert_eq!(a.attract(&particle(1.0, 1.0, 1.0)), Vec2::zero());
    }

    #[test]
    fn oscillation_ramps_and_resets() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut a = Attractor::new(Vec2::zero(), 1.0, 0.1, 15.0, 100.0);
        a.oscillates = true;
        let mut grew = false;
        let mut reset = false;
        let mut prev = a.mass;
        for _ in 0..2000 {
            a.oscillate_mass(&mut rng);
            if a.mass > prev {
                grew = true;
            }
            if grew && a.mass == 1.0 && prev > 1.0 {
                reset = true;
            }
            prev = a.mass;
            assert!(a.mass <= 400.0 * 1.125 + 1.0);
            assert!(a.gravitational_constant > -1.0 && a.gravitational_constant < 5.0);
        }
        assert!(grew && reset);
    }

    #[test]
    fn orbit_keeps_distance_to_center() {
        let mut a = Attractor::new(Vec2::new(46.0, 36.0), 1.0, 1.0, 15.0, 100.0);
        let center = Vec2::new(36.0, 36.0);
        for _ in 0..10 {
            a.orbit(center, 30.0, AngleConversion::Single);
            assert!((a.position.distance(center) - 10.0).abs() < 0.05);
        }
    }

    #[test]
    fn from_config_applies_flags() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let center = Vec2::new(24.0, 24.0);
        let orbiting = Attractor::from_config(&config.attractors[0], center, &mut rng);
        assert!(orbiting.active && orbiting.oscillates);
        assert_eq!(orbiting.orbit_center, Some(Vec2::new(36.0, 36.0)));
        let gather = Attractor::from_config(&config.attractors[1], center, &mut rng);
        assert!(!gather.active && gather.gathers);
        assert_eq!(gather.orbit_center, None);
    }
}
