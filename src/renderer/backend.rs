//! Graphics backend abstraction
//!
//! The engine never talks to a GPU API directly. A backend implements
//! [`GraphicsBackend`] (shader, state and draw operations) and
//! [`BufferAllocator`] (vertex buffer lifetime). Mesh components only ever see
//! the allocator half, shared through a [`SharedDevice`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::error::Result;

/// Opaque GPU vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Opaque compiled shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Opaque linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Location of a uniform inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl ShaderStage {
    /// Human readable stage name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "Vertex",
            Self::Fragment => "Fragment",
        }
    }
}

/// Toggleable pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Back-face culling
    CullBackFaces,
}

/// Vertex buffer lifetime operations
pub trait BufferAllocator {
    /// Allocate a new, empty vertex buffer
    fn create_buffer(&mut self) -> Result<BufferHandle>;

    /// Make `buffer` the current vertex buffer
    fn bind_buffer(&mut self, buffer: BufferHandle);

    /// Upload static data into `buffer`
    fn upload_data(&mut self, buffer: BufferHandle, data: &[u8]);

    /// Release `buffer`
    fn delete_buffer(&mut self, buffer: BufferHandle);
}

/// Device shared between the renderer and the nodes that allocate buffers
pub type SharedDevice = Rc<RefCell<dyn BufferAllocator>>;

/// Low-level drawing API a renderer is built on
pub trait GraphicsBackend: BufferAllocator {
    /// Create an empty shader object
    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle>;

    /// Compile `source` into `shader`; the error string is the info log
    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) -> std::result::Result<(), String>;

    /// Create an empty program object
    fn create_program(&mut self) -> Result<ProgramHandle>;

    /// Attach a compiled stage to a program
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Link `program`; the error string is the info log
    fn link_program(&mut self, program: ProgramHandle) -> std::result::Result<(), String>;

    /// Make `program` current
    fn use_program(&mut self, program: ProgramHandle);

    /// Vertex attribute location, `None` when the program has no such input
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Uniform location, `None` when the program has no such uniform
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Enable `location` and source it from the bound buffer as tightly packed floats
    fn vertex_attribute_pointer(&mut self, location: u32, components: u32);

    /// Upload a vec3 uniform
    fn uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]);

    /// Upload a column-major mat4 uniform
    fn uniform_mat4(&mut self, location: UniformLocation, value: &[f32; 16]);

    /// Draw `count` vertices as a triangle list starting at `first`
    fn draw_triangles(&mut self, first: u32, count: u32);

    /// Clear color and depth
    fn clear(&mut self, color: [f32; 4]);

    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Enable or disable a pipeline capability
    fn set_capability(&mut self, capability: Capability, enabled: bool);
}
