//! Drawing surface seen by components
//!
//! [`RenderSurface`] is the narrow capability the scene graph hands to
//! `Component::render`. Missing attributes or uniforms are reported as `None`
//! rather than errors so a component can decide to skip the draw.

use crate::core::error::Result;
use crate::math::Matrix4;
use crate::renderer::backend::{BufferHandle, ProgramHandle, UniformLocation};

/// Per-frame drawing capability
pub trait RenderSurface {
    /// Clear the frame with the configured color
    fn clear(&mut self) -> Result<()>;

    /// Program draws should use, if one has been selected
    fn active_program(&self) -> Option<ProgramHandle>;

    /// Make `program` current
    fn use_program(&mut self, program: ProgramHandle);

    /// Attribute location in `program`
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Uniform location in `program`
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Bind `buffer` and feed `location` from it with `components` floats per vertex
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, location: u32, components: u32);

    /// Upload a vec3 uniform
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]);

    /// Upload a 4x4 matrix uniform
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Matrix4);

    /// Issue a non-indexed triangle-list draw of `vertex_count` vertices
    fn draw_triangles(&mut self, first: u32, vertex_count: u32);
}
