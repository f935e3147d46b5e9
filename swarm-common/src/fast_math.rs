//! Approximate trigonometry and square roots for the per-particle hot path.
//!
//! Angles are quantized to 256 steps per turn so a full turn maps onto a `u8`
//! and wrapping is a bitmask. Every function here is pure and total: edge
//! inputs (zero, negative, NaN) have a defined result instead of an error.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::sync::LazyLock;

/// Number of entries in the sine table (one full turn).
pub const SIN_TABLE_SIZE: usize = 256;
const SIN_TABLE_MASK: usize = SIN_TABLE_SIZE - 1;
const QUARTER_TURN: usize = SIN_TABLE_SIZE / 4;

/// Upper bound (exclusive) of the square root table; larger inputs use `f32::sqrt`.
pub const SQRT_TABLE_RANGE: f32 = 1024.0;
const SQRT_TABLE_SIZE: usize = SQRT_TABLE_RANGE as usize + 1;

/// Steps per radian: 256 / 2π.
const STEPS_PER_RADIAN: f32 = SIN_TABLE_SIZE as f32 / TAU;

const ATAN_COEFF: f32 = 0.280_86;

/// A quantized angle: 256 steps per full turn, 64 per quarter turn.
pub type AngleStep = u8;

static SIN_TABLE: LazyLock<[f32; SIN_TABLE_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0f32; SIN_TABLE_SIZE];
    for (i, v) in table.iter_mut().enumerate() {
        *v = (i as f32 * TAU / SIN_TABLE_SIZE as f32).sin();
    }
    table
});

// One entry per integer in [0, SQRT_TABLE_RANGE]; the last entry closes the
// interpolation interval just below the range bound.
static SQRT_TABLE: LazyLock<Vec<f32>> =
    LazyLock::new(|| (0..SQRT_TABLE_SIZE).map(|i| (i as f32).sqrt()).collect());

/// Converts radians to the quantized angle domain, rounding to the nearest step.
/// Negative and multi-turn angles wrap.
#[inline]
pub fn rad_to_angle_step(rad: f32) -> AngleStep {
    let steps = (rad * STEPS_PER_RADIAN + 0.5).floor();
    // `as i64` saturates (and maps NaN to 0), the mask wraps into one turn.
    ((steps as i64) & SIN_TABLE_MASK as i64) as AngleStep
}

/// Converts degrees to the quantized angle domain.
#[inline]
pub fn deg_to_angle_step(degrees: f32) -> AngleStep {
    rad_to_angle_step(degrees.to_radians())
}

/// Converts a quantized angle back to radians in `[0, 2π)`.
#[inline]
pub fn angle_step_to_rad(step: AngleStep) -> f32 {
    step as f32 / STEPS_PER_RADIAN
}

/// Sine by table lookup. Resolution is one step (~1.4°).
#[inline]
pub fn fast_sin(step: AngleStep) -> f32 {
    SIN_TABLE[step as usize & SIN_TABLE_MASK]
}

/// Cosine as the quarter-turn shifted sine lookup.
#[inline]
pub fn fast_cos(step: AngleStep) -> f32 {
    SIN_TABLE[(step as usize + QUARTER_TURN) & SIN_TABLE_MASK]
}

/// Square root by table lookup with linear interpolation.
///
/// Inputs `<= 0` (and NaN) return 0. Inputs at or above [`SQRT_TABLE_RANGE`]
/// fall back to the exact `f32::sqrt`. Inside the table the chord always sits
/// below the curve, so results slightly underestimate; the error is largest
/// between 0 and 1 and shrinks quickly above that.
#[inline]
pub fn fast_sqrt(value: f32) -> f32 {
    if value.is_nan() || value <= 0.0 {
        return 0.0;
    }
    if value >= SQRT_TABLE_RANGE {
        return value.sqrt();
    }
    let index = value as usize; // floor, value is positive
    let frac = value - index as f32;
    let lo = SQRT_TABLE[index];
    let hi = SQRT_TABLE[index + 1];
    lo + (hi - lo) * frac
}

/// Approximate `1 / sqrt(value)`.
///
/// Reinterprets the IEEE-754 binary32 bit pattern, applies the magic-constant
/// shift and refines once with Newton-Raphson (~0.2% relative error). Rust's
/// `f32` is always binary32 so `to_bits`/`from_bits` is well defined; the
/// `portable-math` feature swaps in the exact reciprocal for targets where the
/// approximation is not wanted. Inputs `<= 0` (and NaN) return 0.
#[inline]
pub fn fast_inv_sqrt(value: f32) -> f32 {
    if value.is_nan() || value <= 0.0 {
        return 0.0;
    }
    inv_sqrt_impl(value)
}

#[cfg(not(feature = "portable-math"))]
#[inline]
fn inv_sqrt_impl(value: f32) -> f32 {
    const MAGIC: u32 = 0x5f37_59df;
    let half = value * 0.5;
    let bits = MAGIC.wrapping_sub(value.to_bits() >> 1);
    let y = f32::from_bits(bits);
    y * (1.5 - half * y * y)
}

#[cfg(feature = "portable-math")]
#[inline]
fn inv_sqrt_impl(value: f32) -> f32 {
    1.0 / value.sqrt()
}

/// Approximate `atan2(y, x)` in radians, range `[-π, π]`.
///
/// Uses the rational approximation `atan(z) ≈ z / (1 + 0.28086·z²)` on the
/// octant where `|z| <= 1`, then unfolds the octant and quadrant (max error
/// about 0.005 rad). `x == 0` is special-cased: `±π/2`, or 0 when `y == 0`.
#[inline]
pub fn fast_atan2(y: f32, x: f32) -> f32 {
    if x == 0.0 {
        return if y > 0.0 {
            FRAC_PI_2
        } else if y < 0.0 {
            -FRAC_PI_2
        } else {
            0.0
        };
    }

    let abs_x = x.abs();
    let abs_y = y.abs();
    let angle = if abs_y <= abs_x {
        let z = abs_y / abs_x;
        z / (1.0 + ATAN_COEFF * z * z)
    } else {
        let z = abs_x / abs_y;
        FRAC_PI_2 - z / (1.0 + ATAN_COEFF * z * z)
    };

    let angle = if x < 0.0 { PI - angle } else { angle };
    if y < 0.0 { -angle } else { angle }
}
