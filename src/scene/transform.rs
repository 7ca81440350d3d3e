//! Node transform with a cached local matrix
//!
//! Position, Euler rotation (radians) and scale are combined into a local
//! matrix lazily. The matrix is rebuilt only when a mutation has marked the
//! transform dirty; reads on a clean transform return the cached value.
//!
//! The world matrix depends on the parent chain and is computed by
//! [`SceneGraph::world_matrix`](crate::scene::SceneGraph::world_matrix) on every
//! call, so parent changes are visible immediately.

use std::cell::Cell;

use crate::core::error::{Result, ensure_finite};
use crate::math::{Matrix4, Vector3};
use crate::scene::NodeId;

/// Position, rotation and scale of a scene node
#[derive(Debug, Clone)]
pub struct Transform {
    /// Local position
    position: Vector3,
    /// Euler angles in radians, applied X then Y then Z
    rotation: Vector3,
    /// Local scale
    scale: Vector3,
    /// Non-owning reference to the parent node
    parent: Option<NodeId>,

    /// Cached local matrix
    local_matrix: Cell<Matrix4>,
    /// Whether the cache must be rebuilt
    dirty: Cell<bool>,
}

impl Transform {
    /// Create a transform at the origin with unit scale
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
            parent: None,
            local_matrix: Cell::new(Matrix4::IDENTITY),
            dirty: Cell::new(true),
        }
    }

    // -------------------------------------------------------------------------
    // Getters
    // -------------------------------------------------------------------------

    /// Local position
    #[must_use]
    #[inline]
    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// Euler rotation in radians
    #[must_use]
    #[inline]
    pub fn rotation(&self) -> Vector3 {
        self.rotation
    }

    /// Local scale
    #[must_use]
    #[inline]
    pub fn scale(&self) -> Vector3 {
        self.scale
    }

    /// Parent node, if any
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the next `local_matrix` call rebuilds the matrix
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    // -------------------------------------------------------------------------
    // Mutations (invalidate cache)
    // -------------------------------------------------------------------------

    /// Move by a delta
    pub fn translate(&mut self, dx: f32, dy: f32, dz: f32) -> Result<()> {
        ensure_finite(&[dx, dy, dz], "INVALID_TRANSLATE_PARAMS", "Translation")?;
        self.position = Vector3::new(
            self.position.x() + dx,
            self.position.y() + dy,
            self.position.z() + dz,
        )?;
        self.dirty.set(true);
        Ok(())
    }

    /// Add Euler angles (radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) -> Result<()> {
        ensure_finite(&[dx, dy, dz], "INVALID_ROTATE_PARAMS", "Rotation")?;
        self.rotation = Vector3::new(
            self.rotation.x() + dx,
            self.rotation.y() + dy,
            self.rotation.z() + dz,
        )?;
        self.dirty.set(true);
        Ok(())
    }

    /// Replace the position
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.dirty.set(true);
    }

    /// Replace the Euler rotation (radians)
    pub fn set_rotation(&mut self, rotation: Vector3) {
        self.rotation = rotation;
        self.dirty.set(true);
    }

    /// Replace the scale
    pub fn set_scale(&mut self, scale: Vector3) {
        self.scale = scale;
        self.dirty.set(true);
    }

    /// Set the non-owning parent reference; kept in step with the node link
    /// by [`SceneGraph::add_child`](crate::scene::SceneGraph::add_child)
    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    // -------------------------------------------------------------------------
    // Matrices
    // -------------------------------------------------------------------------

    /// Local matrix: identity, translate, rotate X, rotate Y, rotate Z, scale.
    ///
    /// The order is part of the contract; matrix products do not commute.
    #[must_use]
    pub fn local_matrix(&self) -> Matrix4 {
        if self.dirty.get() {
            self.local_matrix.set(self.compose());
            self.dirty.set(false);
        }
        self.local_matrix.get()
    }

    fn compose(&self) -> Matrix4 {
        // Inputs come from Vector3, whose coordinates are always finite
        let (p, r, s) = (self.position, self.rotation, self.scale);
        let mut m = Matrix4::IDENTITY;
        m.apply_translation(p.x(), p.y(), p.z());
        m.apply_rotation(r.to_array());
        m.apply_scale(s.x(), s.y(), s.z());
        m
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
