//! Core Engine struct and frame driver

use serde::Deserialize;

use crate::core::Time;
use crate::core::error::{EngineError, Result};
use crate::renderer::{DEFAULT_CLEAR_COLOR, GraphicsBackend, RenderSurface, Renderer, SharedDevice};
use crate::scene::Scene;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window or surface title
    pub title: String,
    /// RGBA color the frame is cleared to
    pub clear_color: [f32; 4],
    /// Delta times above this many seconds are logged as stalls
    pub stall_threshold: f32,
    /// Initial viewport size (width, height); `None` leaves the backend default
    pub viewport: Option<(u32, u32)>,
    /// Enable depth testing
    pub depth_test: bool,
    /// Enable back-face culling
    pub cull_back_faces: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Diken"),
            clear_color: DEFAULT_CLEAR_COLOR,
            stall_threshold: 0.1,
            viewport: None,
            depth_test: true,
            cull_back_faces: true,
        }
    }
}

impl EngineConfig {
    /// Parse a RON document; missing fields keep their defaults
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Set the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the clear color
    #[must_use]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the stall warning threshold in seconds
    #[must_use]
    pub fn with_stall_threshold(mut self, seconds: f32) -> Self {
        self.stall_threshold = seconds;
        self
    }

    /// Set the initial viewport size
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Some((width, height));
        self
    }

    /// Enable or disable depth testing
    #[must_use]
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    /// Enable or disable back-face culling
    #[must_use]
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.cull_back_faces = enabled;
        self
    }
}

/// Frame driver: owns the renderer and the current scene
pub struct Engine<B: GraphicsBackend + 'static> {
    /// Configuration the engine was created with
    config: EngineConfig,
    /// Renderer over the backend
    renderer: Renderer<B>,
    /// Delta time source
    time: Time,
    /// Scene updated and rendered each frame
    scene: Option<Scene>,
    /// Whether `frame` does anything
    running: bool,
}

impl<B: GraphicsBackend + 'static> Engine<B> {
    /// Create the renderer on `backend` and apply `config`
    pub fn new(config: EngineConfig, backend: B) -> Result<Self> {
        let mut renderer = Renderer::new(backend);
        renderer.set_clear_color(config.clear_color)?;
        renderer.init()?;
        renderer.enable_depth_test(config.depth_test)?;
        renderer.enable_culling(config.cull_back_faces)?;
        if let Some((width, height)) = config.viewport {
            renderer.set_viewport(width, height)?;
        }
        log::info!("Engine '{}' initialized", config.title);

        Ok(Self {
            config,
            renderer,
            time: Time::new(),
            scene: None,
            running: false,
        })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The renderer
    #[must_use]
    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    /// The renderer, mutably
    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    /// Buffer allocator to hand to scenes
    #[must_use]
    pub fn device(&self) -> SharedDevice {
        self.renderer.device()
    }

    /// Frame timing
    #[must_use]
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Empty scene wired to this engine's device
    #[must_use]
    pub fn create_scene(&self, name: impl Into<String>) -> Scene {
        Scene::with_device(name, self.device())
    }

    /// Make `scene` current, returning the previous one
    pub fn load_scene(&mut self, scene: Scene) -> Option<Scene> {
        log::info!("Scene '{}' loaded", scene.name());
        self.scene.replace(scene)
    }

    /// Current scene
    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Current scene, mutably
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Start running; `now` is the host's monotonic time in seconds
    pub fn start(&mut self, now: f64) {
        if self.running {
            return;
        }
        self.running = true;
        self.time.reset(now);
        log::info!("Engine running");
    }

    /// Stop running; further frames are ignored
    pub fn stop(&mut self) {
        self.running = false;
        log::info!("Engine stopped");
    }

    /// Whether frames are being processed
    #[must_use]
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one frame at `now`: update then clear and render the scene.
    ///
    /// Returns the delta time used, or `None` when the engine is stopped.
    pub fn frame(&mut self, now: f64) -> Result<Option<f32>> {
        if !self.running {
            return Ok(None);
        }

        let dt = self.time.tick(now);
        if dt > self.config.stall_threshold {
            log::warn!("Large delta time: {dt:.3}s");
        }

        if let Some(scene) = self.scene.as_mut() {
            scene.update(dt);
            self.renderer.clear().map_err(|err| {
                EngineError::resource("RENDER_FAILED", format!("Render failed: {err}"))
            })?;
            scene.render(&mut self.renderer);
        }
        Ok(Some(dt))
    }

    /// Destroy the current scene and stop
    pub fn shutdown(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.destroy();
        }
        self.stop();
    }
}
