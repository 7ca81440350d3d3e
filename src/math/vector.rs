//! 2D and 3D vector value types
//!
//! Vectors are immutable `Copy` values: every operation returns a new vector.
//! Coordinates are always finite; [`Vector2::new`] and [`Vector3::new`] refuse
//! NaN and infinities.

use std::fmt;
use std::ops::Neg;

use crate::core::error::{EngineError, Result, ensure_finite};

fn check_scalar(scalar: f32) -> Result<()> {
    ensure_finite(&[scalar], "INVALID_SCALAR_PARAM", "Scalar")
}

fn check_divisor(scalar: f32) -> Result<()> {
    check_scalar(scalar)?;
    if scalar == 0.0 {
        return Err(EngineError::arithmetic(
            "DIVISION_BY_ZERO",
            "Division by zero",
        ));
    }
    Ok(())
}

// ============================================================================
// Vector2
// ============================================================================

/// 2D vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    x: f32,
    y: f32,
}

impl Vector2 {
    /// (0, 0)
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    /// (1, 1)
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };
    /// (0, 1)
    pub const UP: Self = Self { x: 0.0, y: 1.0 };
    /// (0, -1)
    pub const DOWN: Self = Self { x: 0.0, y: -1.0 };
    /// (-1, 0)
    pub const LEFT: Self = Self { x: -1.0, y: 0.0 };
    /// (1, 0)
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0 };

    /// Create a vector, rejecting non-finite coordinates
    pub fn new(x: f32, y: f32) -> Result<Self> {
        ensure_finite(&[x, y], "INVALID_VECTOR2_PARAMS", "Vector2 coordinates")?;
        Ok(Self { x, y })
    }

    /// X coordinate
    #[must_use]
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Y coordinate
    #[must_use]
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Component-wise sum; fails if a coordinate overflows
    pub fn add(&self, v: &Self) -> Result<Self> {
        Self::new(self.x + v.x, self.y + v.y)
    }

    /// Component-wise difference; fails if a coordinate overflows
    pub fn subtract(&self, v: &Self) -> Result<Self> {
        Self::new(self.x - v.x, self.y - v.y)
    }

    /// Scale by a finite scalar
    pub fn multiply(&self, scalar: f32) -> Result<Self> {
        check_scalar(scalar)?;
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Divide by a finite, non-zero scalar
    pub fn divide(&self, scalar: f32) -> Result<Self> {
        check_divisor(scalar)?;
        Self::new(self.x / scalar, self.y / scalar)
    }

    /// Euclidean length
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared length
    #[must_use]
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction.
    ///
    /// A zero vector cannot be normalized: a warning is logged and the zero
    /// vector is returned instead of NaN.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            log::warn!("Cannot normalize a zero-length Vector2");
            return Self::ZERO;
        }
        Self {
            x: self.x / len,
            y: self.y / len,
        }
    }

    /// Dot product
    #[must_use]
    pub fn dot(&self, v: &Self) -> f32 {
        self.x * v.x + self.y * v.y
    }

    /// Distance between two points
    #[must_use]
    pub fn distance(&self, v: &Self) -> f32 {
        (self.x - v.x).hypot(self.y - v.y)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector2({}, {})", self.x, self.y)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}

impl TryFrom<glam::Vec2> for Vector2 {
    type Error = EngineError;

    fn try_from(v: glam::Vec2) -> Result<Self> {
        Self::new(v.x, v.y)
    }
}

// ============================================================================
// Vector3
// ============================================================================

/// 3D vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Vector3 {
    /// (0, 0, 0)
    pub const ZERO: Self = Self::splat(0.0);
    /// (1, 1, 1)
    pub const ONE: Self = Self::splat(1.0);
    /// (0, 1, 0)
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };
    /// (0, -1, 0)
    pub const DOWN: Self = Self { x: 0.0, y: -1.0, z: 0.0 };
    /// (-1, 0, 0)
    pub const LEFT: Self = Self { x: -1.0, y: 0.0, z: 0.0 };
    /// (1, 0, 0)
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0, z: 0.0 };
    /// (0, 0, 1)
    pub const FORWARD: Self = Self { x: 0.0, y: 0.0, z: 1.0 };
    /// (0, 0, -1)
    pub const BACK: Self = Self { x: 0.0, y: 0.0, z: -1.0 };

    const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Create a vector, rejecting non-finite coordinates
    pub fn new(x: f32, y: f32, z: f32) -> Result<Self> {
        ensure_finite(&[x, y, z], "INVALID_VECTOR3_PARAMS", "Vector3 coordinates")?;
        Ok(Self { x, y, z })
    }

    /// X coordinate
    #[must_use]
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Y coordinate
    #[must_use]
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Z coordinate
    #[must_use]
    #[inline]
    pub fn z(&self) -> f32 {
        self.z
    }

    /// Coordinates as an array
    #[must_use]
    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Component-wise sum; fails if a coordinate overflows
    pub fn add(&self, v: &Self) -> Result<Self> {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    /// Component-wise difference; fails if a coordinate overflows
    pub fn subtract(&self, v: &Self) -> Result<Self> {
        Self::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }

    /// Scale by a finite scalar
    pub fn multiply(&self, scalar: f32) -> Result<Self> {
        check_scalar(scalar)?;
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    /// Divide by a finite, non-zero scalar
    pub fn divide(&self, scalar: f32) -> Result<Self> {
        check_divisor(scalar)?;
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }

    /// Euclidean length
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared length
    #[must_use]
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Unit vector in the same direction.
    ///
    /// A zero vector cannot be normalized: a warning is logged and the zero
    /// vector is returned instead of NaN.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            log::warn!("Cannot normalize a zero-length Vector3");
            return Self::ZERO;
        }
        Self {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
        }
    }

    /// Dot product
    #[must_use]
    pub fn dot(&self, v: &Self) -> f32 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// Right-handed cross product; fails if a coordinate overflows
    pub fn cross(&self, v: &Self) -> Result<Self> {
        Self::new(
            self.y * v.z - self.z * v.y,
            self.z * v.x - self.x * v.z,
            self.x * v.y - self.y * v.x,
        )
    }

    /// Distance between two points
    #[must_use]
    pub fn distance(&self, v: &Self) -> f32 {
        let (dx, dy, dz) = (self.x - v.x, self.y - v.y, self.z - v.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl From<Vector3> for glam::Vec3 {
    fn from(v: Vector3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl TryFrom<glam::Vec3> for Vector3 {
    type Error = EngineError;

    fn try_from(v: glam::Vec3) -> Result<Self> {
        Self::new(v.x, v.y, v.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn v3(x: f32, y: f32, z: f32) -> Vector3 {
        Vector3::new(x, y, z).unwrap()
    }

    #[test]
    fn test_construction_rejects_non_finite() {
        assert!(Vector2::new(f32::NAN, 0.0).is_err());
        assert!(Vector3::new(0.0, f32::INFINITY, 0.0).is_err());
        let err = Vector3::new(0.0, 0.0, f32::NEG_INFINITY).unwrap_err();
        assert_eq!(err.code(), "INVALID_VECTOR3_PARAMS");
    }

    #[test]
    fn test_add_negation_is_zero() {
        for &(x, y, z) in &[(1.0, 2.0, 3.0), (-4.5, 0.25, 1e6), (0.0, -0.0, 7.0)] {
            let v = v3(x, y, z);
            assert_eq!(v.add(&v3(-x, -y, -z)).unwrap(), Vector3::ZERO);
            assert_eq!(v.add(&-v).unwrap(), Vector3::ZERO);
        }
    }

    #[test]
    fn test_cross_follows_right_hand_rule() {
        assert_eq!(Vector3::RIGHT.cross(&Vector3::UP).unwrap(), Vector3::FORWARD);
        assert_eq!(Vector3::UP.cross(&Vector3::RIGHT).unwrap(), Vector3::BACK);

        let expected = glam::Vec3::new(1.0, 2.0, 3.0).cross(glam::Vec3::new(-2.0, 0.5, 4.0));
        let got: glam::Vec3 = v3(1.0, 2.0, 3.0).cross(&v3(-2.0, 0.5, 4.0)).unwrap().into();
        assert!((got - expected).length() < 1e-5);
    }

    #[test]
    fn test_divide_by_zero_fails() {
        let err = Vector2::new(1.0, 2.0).unwrap().divide(0.0).unwrap_err();
        assert_eq!(err.code(), "DIVISION_BY_ZERO");
        assert_eq!(err.kind(), ErrorKind::Arithmetic);

        let err = Vector3::ONE.divide(f32::NAN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), "INVALID_SCALAR_PARAM");

        assert_eq!(v3(2.0, 4.0, 6.0).divide(2.0).unwrap(), v3(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_multiply() {
        assert_eq!(Vector2::ONE.multiply(3.0).unwrap(), Vector2::new(3.0, 3.0).unwrap());
        assert!(Vector3::ONE.multiply(f32::INFINITY).is_err());
    }

    #[test]
    fn test_overflow_is_rejected() {
        let big = v3(f32::MAX, 0.0, 0.0);
        let err = big.multiply(2.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), "INVALID_VECTOR3_PARAMS");
        assert!(big.add(&big).is_err());
        assert!((-big).subtract(&big).is_err());
        assert!(v3(f32::MAX, f32::MAX, 0.0).cross(&v3(0.0, -2.0, 2.0)).is_err());

        let err = Vector2::ONE.divide(1e-45).unwrap_err();
        assert_eq!(err.code(), "INVALID_VECTOR2_PARAMS");
        assert!(Vector2::new(f32::MAX, 0.0).unwrap().add(&Vector2::new(f32::MAX, 0.0).unwrap()).is_err());

        assert_eq!(big.subtract(&big).unwrap(), Vector3::ZERO);
    }

    #[test]
    fn test_normalize_zero_returns_zero() {
        assert_eq!(Vector2::ZERO.normalize(), Vector2::ZERO);
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);

        let n = v3(3.0, 0.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!((n.x() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_length_dot_distance() {
        let a = Vector2::new(3.0, 4.0).unwrap();
        assert!((a.length() - 5.0).abs() < 1e-6);
        assert!((a.length_squared() - 25.0).abs() < 1e-6);
        assert!((a.dot(&Vector2::RIGHT) - 3.0).abs() < 1e-6);
        assert!((a.distance(&Vector2::ZERO) - 5.0).abs() < 1e-6);

        let b = v3(1.0, 2.0, 2.0);
        assert!((b.distance(&Vector3::ZERO) - 3.0).abs() < 1e-6);
        assert!((b.dot(&b) - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_display() {
        assert_eq!(v3(1.0, 2.5, -3.0).to_string(), "Vector3(1, 2.5, -3)");
        assert_eq!(Vector2::UP.to_string(), "Vector2(0, 1)");
    }
}
