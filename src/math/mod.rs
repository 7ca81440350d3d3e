//! Math kernel
//!
//! Small value types used by the scene graph: finite 2D/3D vectors and a
//! column-major 4x4 matrix. Conversions to `glam` are provided for interop.

mod matrix;
mod vector;

pub use matrix::Matrix4;
pub use vector::{Vector2, Vector3};
