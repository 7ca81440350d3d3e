//! A retained-mode 3D scene engine
//!
//! This engine provides:
//! - Vector and 4x4 matrix math
//! - A scene graph of named nodes with transforms and pluggable components
//! - Camera, mesh and script components
//! - A renderer over an abstract graphics backend, plus a headless backend

pub mod core;
pub mod math;
pub mod renderer;
pub mod scene;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{Engine, EngineConfig, EngineError, ErrorKind, Result, Time};
    pub use crate::math::{Matrix4, Vector2, Vector3};
    pub use crate::renderer::{
        BufferAllocator, GraphicsBackend, HeadlessBackend, RenderSurface, Renderer, SharedDevice,
    };
    pub use crate::scene::{
        Camera, Component, ComponentContext, ComponentId, MeshRenderer, NodeId, Scene, SceneGraph,
        SceneNode, Script, ScriptValue, Transform,
    };
}
