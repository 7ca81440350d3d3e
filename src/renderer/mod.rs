//! Rendering module
//!
//! Backend traits, the shader-managing renderer built on them, and a
//! recording backend for running without a GPU.

mod backend;
mod context;
mod headless;
mod surface;

pub use backend::{
    BufferAllocator, BufferHandle, Capability, GraphicsBackend, ProgramHandle, ShaderHandle,
    ShaderStage, SharedDevice, UniformLocation,
};
pub use context::{DEFAULT_CLEAR_COLOR, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER, Renderer};
pub use headless::{BackendCall, HeadlessBackend};
pub use surface::RenderSurface;
