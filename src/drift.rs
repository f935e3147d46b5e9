//! Time-driven parameter drift: swarm size and speed wander between bounds,
//! attractors pulse and orbit.

use swarm_common::{DriftConfig, SimParams};

/// Fires at most once per `interval_ms` of the caller's clock.
#[derive(Debug, Clone)]
pub struct Periodic {
    interval_ms: u64,
    last_ms: u64,
}

impl Periodic {
    pub fn new(interval_ms: u64) -> Self {
        Periodic { interval_ms, last_ms: 0 }
    }

    /// True when at least `interval_ms` passed since the last firing.
    /// A clock that goes backwards never fires until it catches up.
    pub fn ready(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_ms) >= self.interval_ms && now_ms >= self.last_ms {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/// A value walking back and forth between `min` and `max`.
#[derive(Debug, Clone)]
pub struct Bounce {
    value: f32,
    min: f32,
    max: f32,
    step: f32,
    dir: f32,
}

impl Bounce {
    pub fn new(value: f32, min: f32, max: f32, step: f32) -> Self {
        Bounce { value: value.max(min).min(max), min, max, step, dir: 1.0 }
    }

    pub fn advance(&mut self) -> f32 {
        self.advance_by(self.step)
    }

    /// Moves by `step` in the current direction, turning around on reaching a bound.
    pub fn advance_by(&mut self, step: f32) -> f32 {
        let next = self.value + step * self.dir;
        if next >= self.max || next <= self.min {
            self.dir = -self.dir;
        }
        self.value = next.max(self.min).min(self.max);
        self.value
    }
}

/// What the driver should do to its attractors this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftTick {
    /// Oscillating attractors advance their mass ramp.
    pub oscillate: bool,
    /// Degrees orbiting attractors rotate by this frame.
    pub orbit_degrees: f32,
}

/// Drives the slow wandering of `SimParams` between frames.
#[derive(Debug, Clone)]
pub struct ParameterDrift {
    enabled: bool,
    count_timer: Periodic,
    attractor_timer: Periodic,
    count: Bounce,
    speed: Bounce,
    orbit_step: Bounce,
    orbit_degrees: Bounce,
}

impl ParameterDrift {
    pub fn new(config: &DriftConfig, params: &SimParams) -> Self {
        ParameterDrift {
            enabled: config.enabled,
            count_timer: Periodic::new(config.count_interval_ms),
            attractor_timer: Periodic::new(config.attractor_interval_ms),
            count: Bounce::new(
                params.active_count as f32,
                config.count_min as f32,
                config.count_max as f32,
                config.count_step as f32,
            ),
            speed: Bounce::new(params.max_speed, config.speed_min, config.speed_max, config.speed_step),
            orbit_step: Bounce::new(
                config.orbit_step_min,
                config.orbit_step_min,
                config.orbit_step_max,
                config.orbit_step_delta,
            ),
            orbit_degrees: Bounce::new(config.orbit_degrees_min, config.orbit_degrees_min, config.orbit_degrees_max, 1.0),
        }
    }

    /// Advances all drifting values to `now_ms`, writing count and speed into
    /// `params` when drift is enabled.
    pub fn on_frame(&mut self, now_ms: u64, params: &mut SimParams) -> DriftTick {
        if self.enabled && self.count_timer.ready(now_ms) {
            let count = self.count.advance().round() as usize;
            params.set_active_count(count);
            params.max_speed = self.speed.advance();
            log::debug!("Drift: active_count={} max_speed={:.2}", params.active_count, params.max_speed);
        }

        let oscillate = self.attractor_timer.ready(now_ms);
        let step = self.orbit_step.advance();
        let orbit_degrees = self.orbit_degrees.advance_by(step);

        DriftTick { oscillate, orbit_degrees }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_common::SimulationConfig;

    #[test]
    fn periodic_fires_once_per_interval() {
        let mut t = Periodic::new(100);
        assert!(!t.ready(50));
        assert!(t.ready(100));
        assert!(!t.ready(150));
        assert!(t.ready(230));
        assert!(!t.ready(10)); // clock went backwards
        assert!(t.ready(330));
    }

    #[test]
    fn bounce_stays_in_range_and_turns() {
        let mut b = Bounce::new(50.0, 25.0, 60.0, 5.0);
        let values: Vec<f32> = (0..4).map(|_| b.advance()).collect();
        assert_eq!(values, vec![55.0, 60.0, 55.0, 50.0]);
        for _ in 0..100 {
            let v = b.advance();
            assert!((25.0..=60.0).contains(&v));
        }
    }

    #[test]
    fn bounce_with_degenerate_range_does_not_panic() {
        let mut b = Bounce::new(10.0, 50.0, 10.0, 1.0);
        assert!(b.advance().is_finite());
        let mut nan = Bounce::new(1.0, 0.0, f32::NAN, 1.0);
        nan.advance();
    }

    #[test]
    fn drift_updates_params_on_interval() {
        let config = SimulationConfig::default();
        let mut params = config.get_sim_params();
        let mut drift = ParameterDrift::new(&config.drift, &params);

        let tick = drift.on_frame(16, &mut params);
        assert_eq!(params.active_count, 50);
        assert!(!tick.oscillate);
        assert!(tick.orbit_degrees >= 1.0 && tick.orbit_degrees <= 45.0);

        drift.on_frame(8000, &mut params);
        assert_eq!(params.active_count, 55);
        assert!((params.max_speed - 1.9).abs() < 1e-5);

        for ms in 1..200u64 {
            let tick = drift.on_frame(8000 + ms * 8000, &mut params);
            assert!(tick.oscillate);
            assert!(params.active_count >= 25 && params.active_count <= params.capacity);
            assert!(params.max_speed >= 0.9 - 1e-5 && params.max_speed <= 2.8 + 1e-5);
        }
    }

    #[test]
    fn disabled_drift_keeps_params() {
        let mut config = SimulationConfig::default();
        config.drift.enabled = false;
        let mut params = config.get_sim_params();
        let mut drift = ParameterDrift::new(&config.drift, &params);
        drift.on_frame(100_000, &mut params);
        assert_eq!(params.active_count, 50);
        assert_eq!(params.max_speed, 1.8);
    }
}
