//! Scene: a named graph with a root node and a main camera

use crate::core::error::{EngineError, Result, isolate};
use crate::math::Matrix4;
use crate::renderer::{RenderSurface, SharedDevice};
use crate::scene::{Camera, ComponentId, NodeId, SceneGraph};

/// Name of the node every scene is rooted at
pub const ROOT_NAME: &str = "SceneRoot";

/// A scene tree and the camera it is viewed through
#[derive(Debug)]
pub struct Scene {
    /// Scene name, used in log messages
    name: String,
    /// Every node of the scene
    graph: SceneGraph,
    /// Root node; user nodes hang below it
    root: NodeId,
    /// Camera component used for rendering; owned by its node
    main_camera: Option<ComponentId>,
}

impl Scene {
    /// Empty scene without a graphics device
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_graph(name.into(), SceneGraph::new())
    }

    /// Empty scene whose nodes allocate buffers on `device`
    #[must_use]
    pub fn with_device(name: impl Into<String>, device: SharedDevice) -> Self {
        Self::from_graph(name.into(), SceneGraph::with_device(device))
    }

    fn from_graph(name: String, mut graph: SceneGraph) -> Self {
        let root = graph.create_node(ROOT_NAME);
        log::debug!("Created scene '{name}'");
        Self {
            name,
            graph,
            root,
            main_camera: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Scene name
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root node
    #[must_use]
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node storage
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Node storage, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Device handed to new nodes
    pub fn set_device(&mut self, device: Option<SharedDevice>) {
        self.graph.set_device(device);
    }

    // -------------------------------------------------------------------------
    // Game objects
    // -------------------------------------------------------------------------

    /// Create a node directly under the root
    pub fn create_node(&mut self, name: impl Into<String>) -> Result<NodeId> {
        let id = self.graph.create_node(name);
        self.graph.add_child(self.root, id)?;
        Ok(id)
    }

    /// Attach an existing node under the root
    pub fn add_game_object(&mut self, node: NodeId) -> Result<()> {
        self.graph.add_child(self.root, node)
    }

    /// Detach a node from the root; returns false if it was not a root child
    pub fn remove_game_object(&mut self, node: NodeId) -> bool {
        self.graph.remove_child(self.root, node)
    }

    /// First node tagged `tag`, depth-first from the root
    #[must_use]
    pub fn find_game_object_with_tag(&self, tag: &str) -> Option<NodeId> {
        self.graph.find_with_tag(self.root, tag)
    }

    /// All nodes tagged `tag`, depth-first from the root
    #[must_use]
    pub fn find_game_objects_with_tag(&self, tag: &str) -> Vec<NodeId> {
        self.graph.find_all_with_tag(self.root, tag)
    }

    // -------------------------------------------------------------------------
    // Camera
    // -------------------------------------------------------------------------

    /// Use `camera` for rendering; it must be an attached [`Camera`]
    pub fn set_main_camera(&mut self, camera: ComponentId) -> Result<()> {
        let is_camera = self
            .graph
            .component_dyn(camera)
            .is_some_and(|component| component.is::<Camera>());
        if !is_camera {
            return Err(EngineError::validation(
                "INVALID_CAMERA_TYPE",
                "Main camera must be a Camera component",
            ));
        }
        self.main_camera = Some(camera);
        Ok(())
    }

    /// Current main camera, if still attached
    #[must_use]
    pub fn main_camera(&self) -> Option<ComponentId> {
        self.main_camera
            .filter(|&id| self.graph.component::<Camera>(id).is_some())
    }

    /// Main camera component
    #[must_use]
    pub fn main_camera_component(&self) -> Option<&Camera> {
        self.graph.component::<Camera>(self.main_camera?)
    }

    /// Model-view-projection through the main camera
    pub fn main_camera_mvp(&mut self, model: &Matrix4) -> Result<Matrix4> {
        let camera = self.main_camera().ok_or_else(|| {
            EngineError::resource("NO_MAIN_CAMERA", format!("Scene '{}' has no main camera", self.name))
        })?;
        self.graph.camera_mvp(camera, model)
    }

    // -------------------------------------------------------------------------
    // Frame
    // -------------------------------------------------------------------------

    /// Update the whole tree; failures are logged, never returned
    pub fn update(&mut self, dt: f32) {
        let result = self.graph.update(self.root, dt);
        isolate(result, || format!("Scene update failed ({})", self.name));
    }

    /// Render the whole tree; failures are logged, never returned
    pub fn render(&mut self, surface: &mut dyn RenderSurface) {
        let result = self.graph.render(self.root, surface);
        isolate(result, || format!("Scene render failed ({})", self.name));
    }

    /// Run `start` on every component in the scene, parents before children
    pub fn start(&mut self) {
        let nodes: Vec<NodeId> = self.graph.preorder(self.root).collect();
        for node in nodes {
            let result = self.graph.start_components(node);
            isolate(result, || format!("Scene start failed ({})", self.name));
        }
    }

    /// Tear down every node. The scene is left with a fresh empty root.
    pub fn destroy(&mut self) {
        let result = self.graph.destroy(self.root);
        isolate(result, || format!("Scene destroy failed ({})", self.name));
        self.root = self.graph.create_node(ROOT_NAME);
        self.main_camera = None;
        log::debug!("Destroyed scene '{}'", self.name);
    }
}
