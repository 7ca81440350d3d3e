//! Camera component
//!
//! Perspective projection from field of view (degrees), aspect ratio and clip
//! planes. The view matrix always looks down -Z from the owning node's world
//! position with +Y up; node rotation is not taken into account.

use std::cell::Cell;

use crate::core::error::{Result, ensure_finite};
use crate::math::{Matrix4, Vector3};
use crate::scene::{Component, ComponentContext};

/// Default vertical field of view in degrees
pub const DEFAULT_FOV: f32 = 45.0;
/// Default near clip plane
pub const DEFAULT_NEAR: f32 = 0.1;
/// Default far clip plane
pub const DEFAULT_FAR: f32 = 1000.0;

/// Perspective camera
#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in degrees
    fov: f32,
    /// Width over height
    aspect: f32,
    /// Near clip plane distance
    near: f32,
    /// Far clip plane distance
    far: f32,

    /// Cached projection
    projection: Cell<Matrix4>,
    /// Whether the projection must be rebuilt
    dirty: Cell<bool>,
    /// Last view matrix computed
    view: Matrix4,
}

impl Camera {
    /// Camera with 45 degree FOV, square aspect and planes at 0.1 and 1000
    #[must_use]
    pub fn new() -> Self {
        Self {
            fov: DEFAULT_FOV,
            aspect: 1.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            projection: Cell::new(Matrix4::IDENTITY),
            dirty: Cell::new(true),
            view: Matrix4::IDENTITY,
        }
    }

    // -------------------------------------------------------------------------
    // Getters
    // -------------------------------------------------------------------------

    /// Field of view in degrees
    #[must_use]
    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Aspect ratio
    #[must_use]
    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near clip plane
    #[must_use]
    #[inline]
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip plane
    #[must_use]
    #[inline]
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Whether the projection will be rebuilt on next access
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    /// Replace all projection parameters and rebuild the projection
    pub fn set_perspective(&mut self, fov: f32, aspect: f32, near: f32, far: f32) -> Result<()> {
        ensure_finite(&[fov, aspect, near, far], "INVALID_CAMERA_PARAMS", "Camera parameters")?;
        self.fov = fov;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.update_projection_matrix();
        Ok(())
    }

    /// Change the aspect ratio, typically after a resize
    pub fn set_aspect(&mut self, aspect: f32) -> Result<()> {
        ensure_finite(&[aspect], "INVALID_CAMERA_PARAMS", "Aspect ratio")?;
        self.aspect = aspect;
        self.dirty.set(true);
        Ok(())
    }

    /// Change the field of view (degrees)
    pub fn set_fov(&mut self, fov: f32) -> Result<()> {
        ensure_finite(&[fov], "INVALID_CAMERA_PARAMS", "Field of view")?;
        self.fov = fov;
        self.dirty.set(true);
        Ok(())
    }

    /// Change the clip planes
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<()> {
        ensure_finite(&[near, far], "INVALID_CAMERA_PARAMS", "Clip planes")?;
        self.near = near;
        self.far = far;
        self.dirty.set(true);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Matrices
    // -------------------------------------------------------------------------

    /// Rebuild the projection from the current parameters
    pub fn update_projection_matrix(&self) {
        let fov_radians = self.fov.to_radians();
        self.projection.set(Matrix4::perspective(
            fov_radians,
            self.aspect,
            self.near,
            self.far,
        ));
        self.dirty.set(false);
    }

    /// Projection matrix, rebuilt first if a parameter changed
    #[must_use]
    pub fn projection_matrix(&self) -> Matrix4 {
        if self.dirty.get() {
            self.update_projection_matrix();
        }
        self.projection.get()
    }

    /// Recompute the view from `eye`, looking down -Z with +Y up
    pub fn update_view_matrix(&mut self, eye: Vector3) -> Result<()> {
        let target = eye.add(&Vector3::BACK)?;
        self.view = Matrix4::look_at(&eye, &target, &Vector3::UP)?;
        Ok(())
    }

    /// Last view matrix computed
    #[must_use]
    #[inline]
    pub fn view_matrix(&self) -> Matrix4 {
        self.view
    }

    /// `projection * view * model`, refreshing the view from `eye` first
    pub fn mvp_matrix(&mut self, eye: Vector3, model: &Matrix4) -> Result<Matrix4> {
        self.update_view_matrix(eye)?;
        Ok(self.projection_matrix().multiply(&self.view).multiply(model))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Camera {
    fn kind(&self) -> &'static str {
        "Camera"
    }

    fn awake(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
        self.update_projection_matrix();
        self.update_view_matrix(ctx.world_position()?)
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<()> {
        self.update_view_matrix(ctx.world_position()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;

    #[test]
    fn test_defaults() {
        let camera = Camera::new();
        assert_eq!(camera.fov(), 45.0);
        assert_eq!(camera.aspect(), 1.0);
        assert_eq!(camera.near(), 0.1);
        assert_eq!(camera.far(), 1000.0);
        assert!(camera.is_dirty());
    }

    #[test]
    fn test_projection_uses_degrees() {
        let camera = Camera::new();
        let expected = Matrix4::perspective(45.0_f32.to_radians(), 1.0, 0.1, 1000.0);
        assert!(camera.projection_matrix().approx_eq(&expected, 1e-6));
        assert!(!camera.is_dirty());
    }

    #[test]
    fn test_set_perspective_validates() {
        let mut camera = Camera::new();
        let err = camera
            .set_perspective(f32::NAN, 1.0, 0.1, 100.0)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CAMERA_PARAMS");
        assert_eq!(camera.fov(), 45.0);

        camera.set_perspective(60.0, 16.0 / 9.0, 0.1, 100.0).unwrap();
        assert!(!camera.is_dirty());
        assert_eq!(camera.fov(), 60.0);
    }

    #[test]
    fn test_setters_mark_projection_dirty() {
        let mut camera = Camera::new();
        let before = camera.projection_matrix();
        camera.set_aspect(2.0).unwrap();
        assert!(camera.is_dirty());
        let after = camera.projection_matrix();
        assert!((after.elements()[0] - before.elements()[0] / 2.0).abs() < 1e-6);
        assert!(camera.set_clip_planes(0.5, f32::INFINITY).is_err());
    }

    #[test]
    fn test_view_looks_down_negative_z() {
        let mut camera = Camera::new();
        let eye = Vector3::new(1.0, 2.0, 3.0).unwrap();
        camera.update_view_matrix(eye).unwrap();
        let expected = glam::Mat4::look_at_rh(
            glam::Vec3::new(1.0, 2.0, 3.0),
            glam::Vec3::new(1.0, 2.0, 2.0),
            glam::Vec3::Y,
        );
        assert!(camera.view_matrix().approx_eq(&Matrix4::from(expected), 1e-6));
    }

    #[test]
    fn test_mvp_with_identity_model_is_projection_times_view() {
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Camera");
        graph
            .node_mut(node)
            .unwrap()
            .transform_mut()
            .translate(0.0, 1.0, 5.0)
            .unwrap();
        let mut camera = Box::new(Camera::new());
        camera.set_perspective(60.0, 16.0 / 9.0, 0.1, 100.0).unwrap();
        let id = graph.add_component(node, camera).unwrap();

        let mvp = graph.camera_mvp(id, &Matrix4::IDENTITY).unwrap();

        let camera = graph.component::<Camera>(id).unwrap();
        let eye = Vector3::new(0.0, 1.0, 5.0).unwrap();
        let target = eye.add(&Vector3::BACK).unwrap();
        let view = Matrix4::look_at(&eye, &target, &Vector3::UP).unwrap();
        let expected = camera.projection_matrix().multiply(&view);
        assert!(mvp.approx_eq(&expected, 1e-6));
        assert!(camera.view_matrix().approx_eq(&view, 1e-6));
    }

    #[test]
    fn test_mvp_follows_parent_position() {
        let mut graph = SceneGraph::new();
        let rig = graph.create_node("Rig");
        let node = graph.create_node("Camera");
        graph.add_child(rig, node).unwrap();
        let id = graph.add_component(node, Box::new(Camera::new())).unwrap();

        graph
            .node_mut(rig)
            .unwrap()
            .transform_mut()
            .translate(3.0, 0.0, 0.0)
            .unwrap();
        graph.camera_mvp(id, &Matrix4::IDENTITY).unwrap();

        let view = graph.component::<Camera>(id).unwrap().view_matrix();
        // Camera at x = 3 moves the world by -3
        assert!((view.translation()[0] + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_camera_mvp_rejects_other_components() {
        struct Other;
        impl Component for Other {}

        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        let id = graph.add_component(node, Box::new(Other)).unwrap();
        let err = graph.camera_mvp(id, &Matrix4::IDENTITY).unwrap_err();
        assert_eq!(err.code(), "INVALID_CAMERA_TYPE");
    }
}
