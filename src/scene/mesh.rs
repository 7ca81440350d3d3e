//! Mesh rendering components
//!
//! [`MeshRenderer`] draws a flat list of positions (three floats per vertex)
//! as a non-indexed triangle list in a single color. [`MeshRenderer::cube`]
//! builds the cube variant with fixed geometry.

use crate::core::error::{EngineError, Result, ensure_finite};
use crate::renderer::{BufferHandle, RenderSurface, SharedDevice};
use crate::scene::{Component, ComponentContext};

/// Floats per vertex position
pub const FLOATS_PER_VERTEX: usize = 3;

/// Unit cube centered on the origin: 6 faces of 4 vertices each
#[rustfmt::skip]
pub const CUBE_VERTICES: [f32; 72] = [
    // Front face
    -0.5, -0.5,  0.5,
     0.5, -0.5,  0.5,
     0.5,  0.5,  0.5,
    -0.5,  0.5,  0.5,
    // Back face
    -0.5, -0.5, -0.5,
    -0.5,  0.5, -0.5,
     0.5,  0.5, -0.5,
     0.5, -0.5, -0.5,
    // Top face
    -0.5,  0.5, -0.5,
    -0.5,  0.5,  0.5,
     0.5,  0.5,  0.5,
     0.5,  0.5, -0.5,
    // Bottom face
    -0.5, -0.5, -0.5,
     0.5, -0.5, -0.5,
     0.5, -0.5,  0.5,
    -0.5, -0.5,  0.5,
    // Right face
     0.5, -0.5, -0.5,
     0.5,  0.5, -0.5,
     0.5,  0.5,  0.5,
     0.5, -0.5,  0.5,
    // Left face
    -0.5, -0.5, -0.5,
    -0.5, -0.5,  0.5,
    -0.5,  0.5,  0.5,
    -0.5,  0.5, -0.5,
];

/// Which geometry a mesh renderer was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    /// Caller-supplied vertices
    Custom,
    /// [`CUBE_VERTICES`]
    Cube,
}

/// Single-color triangle mesh
#[derive(Debug, Clone)]
pub struct MeshRenderer {
    /// Geometry origin, used for log names
    kind: MeshKind,
    /// Flat positions, three floats per vertex
    vertices: Vec<f32>,
    /// RGB color
    color: [f32; 3],
    /// GPU buffer holding `vertices`, once uploaded
    buffer: Option<BufferHandle>,
}

impl MeshRenderer {
    /// Empty white mesh
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: MeshKind::Custom,
            vertices: Vec::new(),
            color: [1.0, 1.0, 1.0],
            buffer: None,
        }
    }

    /// White mesh with the given vertices
    pub fn with_vertices(vertices: Vec<f32>) -> Result<Self> {
        let mut mesh = Self::new();
        mesh.set_vertices(vertices)?;
        Ok(mesh)
    }

    /// White unit cube
    #[must_use]
    pub fn cube() -> Self {
        Self {
            kind: MeshKind::Cube,
            vertices: CUBE_VERTICES.to_vec(),
            ..Self::new()
        }
    }

    /// Geometry origin
    #[must_use]
    #[inline]
    pub fn mesh_kind(&self) -> MeshKind {
        self.kind
    }

    /// Flat vertex positions
    #[must_use]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Number of vertices (not triangles)
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    /// RGB color
    #[must_use]
    #[inline]
    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    /// GPU buffer, once uploaded
    #[must_use]
    #[inline]
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Change the draw color
    pub fn set_color(&mut self, r: f32, g: f32, b: f32) -> Result<()> {
        ensure_finite(&[r, g, b], "INVALID_COLOR_PARAMS", "Color")?;
        self.color = [r, g, b];
        Ok(())
    }

    /// Replace the geometry; call [`MeshRenderer::create_buffer`] to upload it
    pub fn set_vertices(&mut self, vertices: Vec<f32>) -> Result<()> {
        if vertices.len() % FLOATS_PER_VERTEX != 0 {
            return Err(EngineError::validation(
                "INVALID_VERTICES_TYPE",
                format!(
                    "Vertex list length must be a multiple of {FLOATS_PER_VERTEX}, got {}",
                    vertices.len()
                ),
            ));
        }
        ensure_finite(&vertices, "INVALID_VERTICES_TYPE", "Vertices")?;
        self.vertices = vertices;
        Ok(())
    }

    /// Upload the vertices into a fresh buffer, releasing any previous one
    pub fn create_buffer(&mut self, device: &SharedDevice) -> Result<()> {
        let mut device = device.try_borrow_mut().map_err(|_| {
            EngineError::resource("DEVICE_BUSY", "Graphics device is already borrowed")
        })?;

        if let Some(old) = self.buffer.take() {
            device.delete_buffer(old);
        }
        let buffer = device.create_buffer()?;
        device.bind_buffer(buffer);
        device.upload_data(buffer, bytemuck::cast_slice(&self.vertices));
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Release the buffer, if any
    pub fn release_buffer(&mut self, device: &SharedDevice) -> Result<()> {
        if let Some(buffer) = self.buffer {
            device
                .try_borrow_mut()
                .map_err(|_| {
                    EngineError::resource("DEVICE_BUSY", "Graphics device is already borrowed")
                })?
                .delete_buffer(buffer);
            self.buffer = None;
        }
        Ok(())
    }
}

impl Default for MeshRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for MeshRenderer {
    fn kind(&self) -> &'static str {
        match self.kind {
            MeshKind::Custom => "MeshRenderer",
            MeshKind::Cube => "CubeRenderer",
        }
    }

    fn awake(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
        if let Some(device) = ctx.device() {
            if let Err(err) = self.create_buffer(&device) {
                log::error!(
                    "{} buffer creation failed on '{}': {err}",
                    self.kind(),
                    ctx.node_name()
                );
            }
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        surface: &mut dyn RenderSurface,
    ) -> Result<()> {
        let Some(buffer) = self.buffer else {
            return Ok(());
        };
        if self.vertices.is_empty() {
            return Ok(());
        }

        let Some(program) = surface.active_program() else {
            log::warn!("{}: no shader program available", self.kind());
            return Ok(());
        };
        surface.use_program(program);

        let Some(position) = surface.attribute_location(program, "a_position") else {
            log::warn!("{}: a_position attribute not found", self.kind());
            return Ok(());
        };
        surface.bind_vertex_buffer(buffer, position, FLOATS_PER_VERTEX as u32);

        if let Some(location) = surface.uniform_location(program, "u_color") {
            surface.set_uniform_vec3(location, self.color);
        }
        let mvp = ctx.world_matrix()?;
        if let Some(location) = surface.uniform_location(program, "u_mvpMatrix") {
            surface.set_uniform_mat4(location, &mvp);
        }

        let count = u32::try_from(self.vertex_count()).map_err(|_| {
            EngineError::validation("INVALID_VERTICES_TYPE", "Too many vertices for one draw")
        })?;
        surface.draw_triangles(0, count);
        Ok(())
    }

    fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
        match ctx.device() {
            Some(device) => self.release_buffer(&device),
            None => {
                self.buffer = None;
                Ok(())
            }
        }
    }
}
