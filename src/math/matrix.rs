//! Column-major 4x4 matrix
//!
//! Element `i` lives at column `i / 4`, row `i % 4`; the translation of an
//! affine matrix sits in elements 12..=14. The in-place mutators
//! (`translate`, `scale`, `rotate_*`) post-multiply, so chaining them applies
//! the last call to vertices first.
//!
//! [`Matrix4::multiply`] uses the index convention
//! `c[i*4+j] = Σ_k a[i*4+k] * b[k*4+j]` with `a = self`. Callers compose
//! transforms through this exact convention (world = parent.multiply(local),
//! mvp = projection.multiply(view).multiply(model)), so it must not be swapped
//! for an operator with different semantics.

use std::fmt;

use bytemuck::{Pod, Zeroable};

use crate::core::error::{Result, ensure_finite};
use crate::math::Vector3;

/// 4x4 matrix stored as 16 floats in column-major order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Matrix4 {
    elements: [f32; 16],
}

impl Matrix4 {
    /// The identity matrix
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Create an identity matrix
    #[must_use]
    pub const fn new() -> Self {
        Self::IDENTITY
    }

    /// Wrap raw column-major elements
    #[must_use]
    pub const fn from_elements(elements: [f32; 16]) -> Self {
        Self { elements }
    }

    /// Raw column-major elements
    #[must_use]
    #[inline]
    pub fn elements(&self) -> &[f32; 16] {
        &self.elements
    }

    /// Translation part (elements 12, 13, 14)
    #[must_use]
    pub fn translation(&self) -> [f32; 3] {
        [self.elements[12], self.elements[13], self.elements[14]]
    }

    /// Reset to the identity
    pub fn set_identity(&mut self) -> &mut Self {
        *self = Self::IDENTITY;
        self
    }

    // -------------------------------------------------------------------------
    // Factories
    // -------------------------------------------------------------------------

    /// Right-handed perspective projection with a [-1, 1] depth range
    #[must_use]
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov / 2.0).tan();
        let mut matrix = Self::IDENTITY;
        let e = &mut matrix.elements;
        e[0] = f / aspect;
        e[5] = f;
        e[10] = (far + near) / (near - far);
        e[11] = -1.0;
        e[14] = (2.0 * far * near) / (near - far);
        e[15] = 0.0;
        matrix
    }

    /// Orthographic projection
    #[must_use]
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let mut matrix = Self::IDENTITY;
        let e = &mut matrix.elements;
        e[0] = 2.0 / (right - left);
        e[5] = 2.0 / (top - bottom);
        e[10] = -2.0 / (far - near);
        e[12] = -(right + left) / (right - left);
        e[13] = -(top + bottom) / (top - bottom);
        e[14] = -(far + near) / (far - near);
        e[15] = 1.0;
        matrix
    }

    /// View matrix looking from `eye` towards `target`
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Result<Self> {
        let z_axis = eye.subtract(target)?.normalize();
        let x_axis = up.cross(&z_axis)?.normalize();
        let y_axis = z_axis.cross(&x_axis)?;

        let mut matrix = Self::IDENTITY;
        let e = &mut matrix.elements;
        e[0] = x_axis.x();
        e[4] = x_axis.y();
        e[8] = x_axis.z();
        e[12] = -x_axis.dot(eye);
        e[1] = y_axis.x();
        e[5] = y_axis.y();
        e[9] = y_axis.z();
        e[13] = -y_axis.dot(eye);
        e[2] = z_axis.x();
        e[6] = z_axis.y();
        e[10] = z_axis.z();
        e[14] = -z_axis.dot(eye);
        e[3] = 0.0;
        e[7] = 0.0;
        e[11] = 0.0;
        e[15] = 1.0;
        Ok(matrix)
    }

    // -------------------------------------------------------------------------
    // Composition
    // -------------------------------------------------------------------------

    /// Product of `self` and `other` (see the module docs for the convention)
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let a = &self.elements;
        let b = &other.elements;
        let mut c = [0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                c[i * 4 + j] = a[i * 4] * b[j]
                    + a[i * 4 + 1] * b[4 + j]
                    + a[i * 4 + 2] * b[8 + j]
                    + a[i * 4 + 3] * b[12 + j];
            }
        }
        Self { elements: c }
    }

    /// Post-multiply by a translation
    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> Result<&mut Self> {
        ensure_finite(&[x, y, z], "INVALID_TRANSLATE_PARAMS", "Translation")?;
        self.apply_translation(x, y, z);
        Ok(self)
    }

    /// Post-multiply by a scale
    pub fn scale(&mut self, x: f32, y: f32, z: f32) -> Result<&mut Self> {
        ensure_finite(&[x, y, z], "INVALID_SCALE_PARAMS", "Scale")?;
        self.apply_scale(x, y, z);
        Ok(self)
    }

    /// Post-multiply by a rotation about X (radians)
    pub fn rotate_x(&mut self, angle: f32) -> Result<&mut Self> {
        ensure_finite(&[angle], "INVALID_ROTATE_PARAMS", "Rotation angle")?;
        self.rotate_columns(1, 2, angle);
        Ok(self)
    }

    /// Post-multiply by a rotation about Y (radians)
    pub fn rotate_y(&mut self, angle: f32) -> Result<&mut Self> {
        ensure_finite(&[angle], "INVALID_ROTATE_PARAMS", "Rotation angle")?;
        // Y rotates Z into X, hence the swapped column order
        self.rotate_columns(2, 0, angle);
        Ok(self)
    }

    /// Post-multiply by a rotation about Z (radians)
    pub fn rotate_z(&mut self, angle: f32) -> Result<&mut Self> {
        ensure_finite(&[angle], "INVALID_ROTATE_PARAMS", "Rotation angle")?;
        self.rotate_columns(0, 1, angle);
        Ok(self)
    }

    pub(crate) fn apply_translation(&mut self, x: f32, y: f32, z: f32) {
        let e = &mut self.elements;
        e[12] += e[0] * x + e[4] * y + e[8] * z;
        e[13] += e[1] * x + e[5] * y + e[9] * z;
        e[14] += e[2] * x + e[6] * y + e[10] * z;
        e[15] += e[3] * x + e[7] * y + e[11] * z;
    }

    pub(crate) fn apply_scale(&mut self, x: f32, y: f32, z: f32) {
        for (column, factor) in [x, y, z].into_iter().enumerate() {
            for row in 0..4 {
                self.elements[column * 4 + row] *= factor;
            }
        }
    }

    pub(crate) fn apply_rotation(&mut self, angles: [f32; 3]) {
        let [x, y, z] = angles;
        self.rotate_columns(1, 2, x);
        self.rotate_columns(2, 0, y);
        self.rotate_columns(0, 1, z);
    }

    /// Plane rotation of columns `u` and `v`:
    /// `u' = u*c + v*s`, `v' = v*c - u*s`.
    fn rotate_columns(&mut self, u: usize, v: usize, angle: f32) {
        let (s, c) = angle.sin_cos();
        for row in 0..4 {
            let a = self.elements[u * 4 + row];
            let b = self.elements[v * 4 + row];
            self.elements[u * 4 + row] = a * c + b * s;
            self.elements[v * 4 + row] = b * c - a * s;
        }
    }

    /// Element-wise comparison within `epsilon`
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Matrix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.elements;
        writeln!(f, "Matrix4[")?;
        for row in 0..4 {
            writeln!(
                f,
                "  {:.2}, {:.2}, {:.2}, {:.2}",
                e[row],
                e[4 + row],
                e[8 + row],
                e[12 + row]
            )?;
        }
        write!(f, "]")
    }
}

impl From<Matrix4> for glam::Mat4 {
    fn from(m: Matrix4) -> Self {
        glam::Mat4::from_cols_array(&m.elements)
    }
}

impl From<glam::Mat4> for Matrix4 {
    fn from(m: glam::Mat4) -> Self {
        Self::from_elements(m.to_cols_array())
    }
}
