use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::fast_math::{
    deg_to_angle_step, fast_atan2, fast_cos, fast_inv_sqrt, fast_sin, fast_sqrt, rad_to_angle_step,
    AngleStep,
};

/// How a rotation in degrees is turned into a quantized table angle.
///
/// `Single` is the observed behaviour: degrees -> radians -> step.
/// `Double` additionally feeds the resulting step back through the
/// radians-to-step conversion, reproducing a suspected double conversion
/// so both paths can be compared side by side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleConversion {
    #[default]
    Single,
    Double,
}

impl AngleConversion {
    /// Quantizes `degrees` according to this conversion path.
    pub fn to_step(self, degrees: f32) -> AngleStep {
        let step = deg_to_angle_step(degrees);
        match self {
            AngleConversion::Single => step,
            AngleConversion::Double => rad_to_angle_step(step as f32),
        }
    }
}

/// A simple 2D vector struct.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2.
    #[inline(always)]
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Creates a zero vector.
    #[inline(always)]
    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    /// Calculates the squared length (magnitude) of the vector.
    /// Use this for comparisons to avoid the square root.
    #[inline(always)]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Calculates the exact length (magnitude) of the vector.
    #[inline(always)]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Length through the interpolated square root table.
    #[inline(always)]
    pub fn fast_length(self) -> f32 {
        fast_sqrt(self.length_squared())
    }

    #[inline(always)]
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (self - other).length_squared()
    }

    /// Euclidean distance to another point.
    #[inline(always)]
    pub fn distance(self, other: Vec2) -> f32 {
        self.distance_squared(other).sqrt()
    }

    #[inline(always)]
    pub fn fast_distance(self, other: Vec2) -> f32 {
        fast_sqrt(self.distance_squared(other))
    }

    #[inline(always)]
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[inline(always)]
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Perpendicular vector (rotated a quarter turn clockwise).
    #[inline(always)]
    pub fn ortho(self) -> Vec2 {
        Vec2::new(self.y, -self.x)
    }

    /// Returns the unit vector in the same direction.
    /// A vector with exactly zero magnitude is returned unchanged.
    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            return self;
        }
        self * (1.0 / len)
    }

    /// Normalizes through the bit-level inverse square root (~0.2% error).
    /// A vector with exactly zero magnitude is returned unchanged.
    pub fn fast_normalize(self) -> Vec2 {
        let len_sq = self.length_squared();
        if len_sq == 0.0 {
            return self;
        }
        self * fast_inv_sqrt(len_sq)
    }

    /// Clamps the magnitude to `max`, preserving direction.
    pub fn limit(self, max: f32) -> Vec2 {
        if self.length_squared() > max * max {
            self.normalize() * max
        } else {
            self
        }
    }

    /// Heading angle in radians, from the approximate atan2.
    #[inline]
    pub fn heading(self) -> f32 {
        fast_atan2(self.y, self.x)
    }

    /// Rebuilds the vector with length `len` along its quantized heading.
    pub fn set_length(self, len: f32) -> Vec2 {
        let step = rad_to_angle_step(self.heading());
        Vec2::new(len * fast_cos(step), len * fast_sin(step))
    }

    /// Rotates about the origin by `degrees` using the lookup tables.
    pub fn rotate(self, degrees: f32) -> Vec2 {
        self.rotate_with(degrees, AngleConversion::Single)
    }

    pub fn rotate_with(self, degrees: f32, conversion: AngleConversion) -> Vec2 {
        let step = conversion.to_step(degrees);
        let (c, s) = (fast_cos(step), fast_sin(step));
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Rotates about `center` by `degrees`. Accuracy is bounded by the
    /// 256-step angle quantization.
    pub fn rotate_around_point(self, center: Vec2, degrees: f32) -> Vec2 {
        self.rotate_around_point_with(center, degrees, AngleConversion::Single)
    }

    pub fn rotate_around_point_with(
        self,
        center: Vec2,
        degrees: f32,
        conversion: AngleConversion,
    ) -> Vec2 {
        (self - center).rotate_with(degrees, conversion) + center
    }
}

// Implement standard operators for convenience
impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Add<f32> for Vec2 {
    type Output = Self;
    fn add(self, scalar: f32) -> Self {
        Self { x: self.x + scalar, y: self.y + scalar }
    }
}

impl Sub<f32> for Vec2 {
    type Output = Self;
    fn sub(self, scalar: f32) -> Self {
        Self { x: self.x - scalar, y: self.y - scalar }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        Self { x: self.x / scalar, y: self.y / scalar }
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, scalar: f32) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

impl DivAssign<f32> for Vec2 {
    fn div_assign(&mut self, scalar: f32) {
        self.x /= scalar;
        self.y /= scalar;
    }
}

/// Clamps a value between a minimum and maximum.
#[inline(always)]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2, tol: f32) -> bool {
        (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol
    }

    #[test]
    fn arithmetic_with_vectors_and_scalars() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, -4.0);
        assert_eq!(a + b, Vec2::new(4.0, -2.0));
        assert_eq!(a - b, Vec2::new(-2.0, 6.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
        assert_eq!(b / 2.0, Vec2::new(1.5, -2.0));
        assert_eq!(a + 1.0, Vec2::new(2.0, 3.0));
        assert_eq!(a - 1.0, Vec2::new(0.0, 1.0));
        assert_eq!(-a, Vec2::new(-1.0, -2.0));

        let mut c = a;
        c += b;
        c -= a;
        c *= 2.0;
        c /= 4.0;
        assert_eq!(c, Vec2::new(1.5, -2.0));
    }

    #[test]
    fn length_and_distance() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.length_squared(), 25.0);
        assert_eq!(v.length(), 5.0);
        assert!((v.fast_length() - 5.0).abs() < 0.01);
        assert_eq!(Vec2::zero().distance(v), 5.0);
        assert!((Vec2::new(1.0, 1.0).fast_distance(Vec2::new(4.0, 5.0)) - 5.0).abs() < 0.01);
    }

    #[test]
    fn normalize_zero_vector_is_unchanged() {
        assert_eq!(Vec2::zero().normalize(), Vec2::zero());
        assert_eq!(Vec2::zero().fast_normalize(), Vec2::zero());
    }

    #[test]
    fn normalize_gives_unit_length() {
        let n = Vec2::new(3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
        let f = Vec2::new(-7.0, 2.0).fast_normalize();
        assert!((f.length() - 1.0).abs() < 0.003);
    }

    #[test]
    fn limit_preserves_direction() {
        let v = Vec2::new(30.0, 40.0).limit(5.0);
        assert!(close(v, Vec2::new(3.0, 4.0), 1e-5));
        // Below the cap nothing changes.
        let w = Vec2::new(0.3, 0.4);
        assert_eq!(w.limit(5.0), w);
        assert_eq!(Vec2::zero().limit(1.0), Vec2::zero());
    }

    #[test]
    fn rotate_quarter_turns() {
        let v = Vec2::new(1.0, 0.0);
        assert!(close(v.rotate(90.0), Vec2::new(0.0, 1.0), 1e-5));
        assert!(close(v.rotate(180.0), Vec2::new(-1.0, 0.0), 1e-5));
        assert!(close(v.rotate(-90.0), Vec2::new(0.0, -1.0), 1e-5));
    }

    #[test]
    fn rotate_around_point_keeps_radius() {
        let center = Vec2::new(36.0, 36.0);
        let p = Vec2::new(46.0, 36.0);
        for deg in [1.0f32, 13.0, 45.0, 200.0] {
            let r = p.rotate_around_point(center, deg);
            assert!((r.distance(center) - 10.0).abs() < 0.01, "deg {}", deg);
        }
        assert!(close(p.rotate_around_point(center, 90.0), Vec2::new(36.0, 46.0), 1e-4));
    }

    #[test]
    fn rotation_is_quantized() {
        // 0.5 degrees rounds to step 0 in a 256-step turn.
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(v.rotate(0.5), v);
    }

    #[test]
    fn double_conversion_differs_from_single() {
        // 90 degrees -> step 64; treating 64 as radians lands elsewhere.
        assert_eq!(AngleConversion::Single.to_step(90.0), 64);
        assert_ne!(AngleConversion::Double.to_step(90.0), 64);
        let v = Vec2::new(1.0, 0.0);
        let single = v.rotate_with(90.0, AngleConversion::Single);
        let double = v.rotate_with(90.0, AngleConversion::Double);
        assert!((single.length() - double.length()).abs() < 1e-4);
        assert!(!close(single, double, 1e-3));
    }

    #[test]
    fn set_length_follows_heading() {
        let v = Vec2::new(0.0, 2.0).set_length(5.0);
        assert!(close(v, Vec2::new(0.0, 5.0), 1e-4));
        let d = Vec2::new(1.0, 1.0).set_length(2.0);
        assert!((d.length() - 2.0).abs() < 1e-3);
        assert!((d.x - d.y).abs() < 0.05);
    }

    #[test]
    fn dot_cross_ortho() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.dot(b), 11.0);
        assert_eq!(a.cross(b), -2.0);
        assert_eq!(a.ortho(), Vec2::new(2.0, -1.0));
        assert_eq!(a.dot(a.ortho()), 0.0);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
    }
}
