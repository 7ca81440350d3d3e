//! Recording backend with no GPU behind it
//!
//! Every call is appended to a log that tests and the headless binary can
//! inspect. Failures can be injected to exercise the error paths.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::error::{EngineError, Result};
use crate::renderer::backend::{
    BufferAllocator, BufferHandle, Capability, GraphicsBackend, ProgramHandle, ShaderHandle,
    ShaderStage, UniformLocation,
};

/// Attributes every program exposes
const ATTRIBUTES: [&str; 1] = ["a_position"];

/// Uniforms every program exposes
const UNIFORMS: [&str; 2] = ["u_mvpMatrix", "u_color"];

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer(BufferHandle),
    BindBuffer(BufferHandle),
    UploadData(BufferHandle, usize),
    DeleteBuffer(BufferHandle),
    CreateShader(ShaderHandle, ShaderStage),
    CompileShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    AttachShader(ProgramHandle, ShaderHandle),
    LinkProgram(ProgramHandle),
    UseProgram(ProgramHandle),
    VertexAttributePointer(u32, u32),
    UniformVec3(UniformLocation, [f32; 3]),
    UniformMat4(UniformLocation, [f32; 16]),
    DrawTriangles(u32, u32),
    Clear([f32; 4]),
    Viewport(i32, i32, u32, u32),
    SetCapability(Capability, bool),
}

/// Backend that records instead of rendering
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    /// Call log in issue order
    calls: Vec<BackendCall>,
    /// Next handle value
    next_handle: u32,
    /// Buffers that have been created and not deleted, with their contents
    buffers: FxHashMap<BufferHandle, Vec<u8>>,
    /// Enabled capabilities
    enabled: FxHashSet<Capability>,

    /// Info log returned from every compile, when set
    compile_failure: Option<String>,
    /// Info log returned from every link, when set
    link_failure: Option<String>,
    /// Names the backend pretends the program does not have
    missing_inputs: FxHashSet<String>,
    /// Refuse buffer allocation
    out_of_memory: bool,
}

impl HeadlessBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Failure injection
    // -------------------------------------------------------------------------

    /// Make every shader compile fail with `log`
    pub fn fail_compilation(&mut self, log: impl Into<String>) {
        self.compile_failure = Some(log.into());
    }

    /// Make every program link fail with `log`
    pub fn fail_linking(&mut self, log: impl Into<String>) {
        self.link_failure = Some(log.into());
    }

    /// Hide an attribute or uniform from every program
    pub fn hide_input(&mut self, name: impl Into<String>) {
        self.missing_inputs.insert(name.into());
    }

    /// Make `create_buffer` fail
    pub fn fail_allocation(&mut self, fail: bool) {
        self.out_of_memory = fail;
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Every call issued so far
    #[must_use]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget the recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Draw calls as `(first, count)` pairs
    #[must_use]
    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::DrawTriangles(first, count) => Some((*first, *count)),
                _ => None,
            })
            .collect()
    }

    /// Number of live buffers
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Contents of a live buffer
    #[must_use]
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Whether a capability is currently enabled
    #[must_use]
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn has_input(&self, name: &str, known: &[&str]) -> bool {
        known.contains(&name) && !self.missing_inputs.contains(name)
    }
}

impl BufferAllocator for HeadlessBackend {
    fn create_buffer(&mut self) -> Result<BufferHandle> {
        if self.out_of_memory {
            return Err(EngineError::resource(
                "BUFFER_ALLOCATION_FAILED",
                "Headless backend refused to allocate a buffer",
            ));
        }
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle, Vec::new());
        self.calls.push(BackendCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn bind_buffer(&mut self, buffer: BufferHandle) {
        self.calls.push(BackendCall::BindBuffer(buffer));
    }

    fn upload_data(&mut self, buffer: BufferHandle, data: &[u8]) {
        match self.buffers.get_mut(&buffer) {
            Some(contents) => *contents = data.to_vec(),
            None => log::warn!("Upload into unknown buffer {buffer:?}"),
        }
        self.calls.push(BackendCall::UploadData(buffer, data.len()));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.calls.push(BackendCall::DeleteBuffer(buffer));
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle> {
        let handle = ShaderHandle(self.next());
        self.calls.push(BackendCall::CreateShader(handle, stage));
        Ok(handle)
    }

    fn compile_shader(&mut self, shader: ShaderHandle, _source: &str) -> std::result::Result<(), String> {
        self.calls.push(BackendCall::CompileShader(shader));
        match &self.compile_failure {
            Some(log) => Err(log.clone()),
            None => Ok(()),
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        let handle = ProgramHandle(self.next());
        self.calls.push(BackendCall::CreateProgram(handle));
        Ok(handle)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        self.calls.push(BackendCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramHandle) -> std::result::Result<(), String> {
        self.calls.push(BackendCall::LinkProgram(program));
        match &self.link_failure {
            Some(log) => Err(log.clone()),
            None => Ok(()),
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn attribute_location(&self, _program: ProgramHandle, name: &str) -> Option<u32> {
        self.has_input(name, &ATTRIBUTES)
            .then(|| ATTRIBUTES.iter().position(|a| *a == name))
            .flatten()
            .map(|index| index as u32)
    }

    fn uniform_location(&self, _program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.has_input(name, &UNIFORMS)
            .then(|| UNIFORMS.iter().position(|u| *u == name))
            .flatten()
            .map(|index| UniformLocation(index as u32))
    }

    fn vertex_attribute_pointer(&mut self, location: u32, components: u32) {
        self.calls
            .push(BackendCall::VertexAttributePointer(location, components));
    }

    fn uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]) {
        self.calls.push(BackendCall::UniformVec3(location, value));
    }

    fn uniform_mat4(&mut self, location: UniformLocation, value: &[f32; 16]) {
        self.calls.push(BackendCall::UniformMat4(location, *value));
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        self.calls.push(BackendCall::DrawTriangles(first, count));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(BackendCall::Clear(color));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(BackendCall::Viewport(x, y, width, height));
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.enabled.insert(capability);
        } else {
            self.enabled.remove(&capability);
        }
        self.calls.push(BackendCall::SetCapability(capability, enabled));
    }
}
