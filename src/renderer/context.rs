//! Main renderer implementation
//!
//! Wraps a [`GraphicsBackend`] with shader program management, frame clearing
//! and pipeline state, and exposes it to the scene as a [`RenderSurface`].

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use crate::core::error::{EngineError, Result, ensure_finite};
use crate::math::Matrix4;
use crate::renderer::backend::{
    BufferHandle, Capability, GraphicsBackend, ProgramHandle, ShaderHandle, ShaderStage,
    SharedDevice, UniformLocation,
};
use crate::renderer::surface::RenderSurface;

/// Flat-color vertex shader used when nothing else is selected
pub const DEFAULT_VERTEX_SHADER: &str = r"
attribute vec3 a_position;
uniform mat4 u_mvpMatrix;
void main() {
    gl_Position = u_mvpMatrix * vec4(a_position, 1.0);
}
";

/// Flat-color fragment shader used when nothing else is selected
pub const DEFAULT_FRAGMENT_SHADER: &str = r"
precision mediump float;
uniform vec3 u_color;
void main() {
    gl_FragColor = vec4(u_color, 1.0);
}
";

/// Default clear color (dark grey)
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// Renderer over a graphics backend
pub struct Renderer<B: GraphicsBackend + 'static> {
    /// Backend, shared with nodes through [`Renderer::device`]
    backend: Rc<RefCell<B>>,
    /// Program compiled by [`Renderer::init`]
    default_program: Option<ProgramHandle>,
    /// Program selected with [`Renderer::use_shader`]
    current_program: Option<ProgramHandle>,
    /// Color used by [`RenderSurface::clear`]
    clear_color: [f32; 4],
}

impl<B: GraphicsBackend + 'static> Renderer<B> {
    /// Wrap a backend; call [`Renderer::init`] before drawing
    pub fn new(backend: B) -> Self {
        Self {
            backend: Rc::new(RefCell::new(backend)),
            default_program: None,
            current_program: None,
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }

    /// Compile the default program and enable depth testing and back-face culling
    pub fn init(&mut self) -> Result<()> {
        let program = self
            .create_shader_program(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
            .map_err(|err| {
                EngineError::resource(
                    "RENDERER_INIT_FAILED",
                    format!("Renderer initialization failed: {err}"),
                )
            })?;
        self.default_program = Some(program);
        self.current_program = Some(program);

        let mut backend = self.backend_mut()?;
        backend.set_capability(Capability::DepthTest, true);
        backend.set_capability(Capability::CullBackFaces, true);
        drop(backend);

        log::info!("Renderer initialized");
        Ok(())
    }

    /// Compile both stages and link them into a program
    pub fn create_shader_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle> {
        let vertex = self.compile_shader(ShaderStage::Vertex, vertex_source)?;
        let fragment = self.compile_shader(ShaderStage::Fragment, fragment_source)?;

        let mut backend = self.backend_mut()?;
        let program = backend.create_program()?;
        backend.attach_shader(program, vertex);
        backend.attach_shader(program, fragment);
        backend.link_program(program).map_err(EngineError::ShaderLink)?;
        log::debug!("Linked shader program {program:?}");
        Ok(program)
    }

    /// Compile a single shader stage
    pub fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle> {
        if source.trim().is_empty() {
            return Err(EngineError::validation(
                "INVALID_SHADER_SOURCE",
                format!("{} shader source is empty", stage.name()),
            ));
        }
        let mut backend = self.backend_mut()?;
        let shader = backend.create_shader(stage)?;
        backend
            .compile_shader(shader, source)
            .map_err(|log| EngineError::ShaderCompile {
                stage: stage.name(),
                log,
            })?;
        Ok(shader)
    }

    /// Select the program used by subsequent draws
    pub fn use_shader(&mut self, program: ProgramHandle) -> Result<()> {
        self.backend_mut()?.use_program(program);
        self.current_program = Some(program);
        Ok(())
    }

    /// Program compiled by `init`
    #[must_use]
    pub fn default_program(&self) -> Option<ProgramHandle> {
        self.default_program
    }

    /// Clear with an explicit color
    pub fn clear_with(&mut self, r: f32, g: f32, b: f32, a: f32) -> Result<()> {
        ensure_finite(&[r, g, b, a], "INVALID_COLOR_PARAMS", "Clear color")?;
        self.backend_mut()?.clear([r, g, b, a]);
        Ok(())
    }

    /// Change the color used by `clear`
    pub fn set_clear_color(&mut self, color: [f32; 4]) -> Result<()> {
        ensure_finite(&color, "INVALID_COLOR_PARAMS", "Clear color")?;
        self.clear_color = color;
        Ok(())
    }

    /// Set the viewport to `width` x `height` at the origin
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.backend_mut()?.viewport(0, 0, width, height);
        log::debug!("Viewport set to {width}x{height}");
        Ok(())
    }

    /// Toggle depth testing
    pub fn enable_depth_test(&mut self, enable: bool) -> Result<()> {
        self.backend_mut()?.set_capability(Capability::DepthTest, enable);
        Ok(())
    }

    /// Toggle back-face culling
    pub fn enable_culling(&mut self, enable: bool) -> Result<()> {
        self.backend_mut()?.set_capability(Capability::CullBackFaces, enable);
        Ok(())
    }

    /// Buffer allocator handed to scene nodes
    #[must_use]
    pub fn device(&self) -> SharedDevice {
        self.backend.clone()
    }

    /// Shared access to the backend
    #[must_use]
    pub fn backend(&self) -> Rc<RefCell<B>> {
        Rc::clone(&self.backend)
    }

    fn backend_mut(&self) -> Result<RefMut<'_, B>> {
        self.backend.try_borrow_mut().map_err(|_| {
            EngineError::resource("DEVICE_BUSY", "Graphics backend is already borrowed")
        })
    }

    fn with_backend(&self, f: impl FnOnce(&mut B)) {
        match self.backend_mut() {
            Ok(mut backend) => f(&mut backend),
            Err(err) => log::error!("Draw command dropped: {err}"),
        }
    }
}

impl<B: GraphicsBackend + 'static> RenderSurface for Renderer<B> {
    fn clear(&mut self) -> Result<()> {
        let [r, g, b, a] = self.clear_color;
        self.clear_with(r, g, b, a)
    }

    fn active_program(&self) -> Option<ProgramHandle> {
        self.current_program.or(self.default_program)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.with_backend(|backend| backend.use_program(program));
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.backend
            .try_borrow()
            .ok()
            .and_then(|backend| backend.attribute_location(program, name))
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.backend
            .try_borrow()
            .ok()
            .and_then(|backend| backend.uniform_location(program, name))
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, location: u32, components: u32) {
        self.with_backend(|backend| {
            backend.bind_buffer(buffer);
            backend.vertex_attribute_pointer(location, components);
        });
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]) {
        self.with_backend(|backend| backend.uniform_vec3(location, value));
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Matrix4) {
        self.with_backend(|backend| backend.uniform_mat4(location, value.elements()));
    }

    fn draw_triangles(&mut self, first: u32, vertex_count: u32) {
        self.with_backend(|backend| backend.draw_triangles(first, vertex_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{BackendCall, HeadlessBackend};

    #[test]
    fn test_init_compiles_default_program() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.init().unwrap();

        let program = renderer.default_program().unwrap();
        assert_eq!(renderer.active_program(), Some(program));

        let calls = renderer.backend().borrow().calls().to_vec();
        assert!(calls.contains(&BackendCall::SetCapability(Capability::DepthTest, true)));
        assert!(calls.contains(&BackendCall::SetCapability(Capability::CullBackFaces, true)));
    }

    #[test]
    fn test_compile_failure_reports_stage() {
        let mut backend = HeadlessBackend::new();
        backend.fail_compilation("syntax error at line 1");
        let mut renderer = Renderer::new(backend);

        let err = renderer
            .create_shader_program("void main() {}", "void main() {}")
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::ShaderCompile {
                stage: "Vertex",
                log: "syntax error at line 1".into(),
            }
        );

        let err = renderer.init().unwrap_err();
        assert_eq!(err.code(), "RENDERER_INIT_FAILED");
    }

    #[test]
    fn test_link_failure() {
        let mut backend = HeadlessBackend::new();
        backend.fail_linking("varying mismatch");
        let mut renderer = Renderer::new(backend);

        let err = renderer
            .create_shader_program(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
            .unwrap_err();
        assert_eq!(err.code(), "SHADER_LINK_ERROR");
    }

    #[test]
    fn test_empty_source_rejected() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let err = renderer.compile_shader(ShaderStage::Fragment, "  ").unwrap_err();
        assert_eq!(err.code(), "INVALID_SHADER_SOURCE");
    }

    #[test]
    fn test_clear_uses_configured_color() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.set_clear_color([0.2, 0.3, 0.4, 1.0]).unwrap();
        renderer.clear().unwrap();
        assert!(
            renderer
                .backend()
                .borrow()
                .calls()
                .contains(&BackendCall::Clear([0.2, 0.3, 0.4, 1.0]))
        );

        assert_eq!(
            renderer.clear_with(f32::NAN, 0.0, 0.0, 1.0).unwrap_err().code(),
            "INVALID_COLOR_PARAMS"
        );
    }

    #[test]
    fn test_use_shader_switches_active_program() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.init().unwrap();
        let custom = renderer
            .create_shader_program(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
            .unwrap();
        renderer.use_shader(custom).unwrap();
        assert_eq!(renderer.active_program(), Some(custom));
        assert_ne!(renderer.default_program(), Some(custom));
    }

    #[test]
    fn test_viewport_and_state_toggles() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.set_viewport(640, 480).unwrap();
        renderer.enable_depth_test(false).unwrap();
        renderer.enable_culling(false).unwrap();

        let backend = renderer.backend();
        let backend = backend.borrow();
        assert!(backend.calls().contains(&BackendCall::Viewport(0, 0, 640, 480)));
        assert!(!backend.is_enabled(Capability::DepthTest));
        assert!(!backend.is_enabled(Capability::CullBackFaces));
    }
}
