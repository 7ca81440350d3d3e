//! Component capability
//!
//! Components are attached to scene nodes as `Box<dyn Component>` and receive
//! lifecycle hooks from the [`SceneGraph`] traversals. Every hook gets a
//! [`ComponentContext`] giving mutable access to the graph; while a hook runs,
//! the component itself is detached from its slot, so lookups of the running
//! component through the graph return `None`.

use std::any::Any;

use crate::core::error::{EngineError, Result};
use crate::math::{Matrix4, Vector3};
use crate::renderer::{RenderSurface, SharedDevice};
use crate::scene::{NodeId, SceneGraph, SceneNode, Transform};

slotmap::new_key_type! {
    /// Handle to a component attached somewhere in a [`SceneGraph`]
    pub struct ComponentId;
}

/// Upcast to `Any` for downcasting trait objects
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Unit of behavior or rendering attached to a scene node.
///
/// All hooks default to no-ops. Errors returned from hooks are logged by the
/// graph together with the node name and [`Component::kind`], then dropped.
pub trait Component: AsAny {
    /// Name used in log messages
    fn kind(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Called once, right after the component is attached
    fn awake(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called by [`SceneGraph::start_components`]
    fn start(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once per frame with the elapsed seconds
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<()> {
        Ok(())
    }

    /// Called once per frame after `update`
    fn render(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        _surface: &mut dyn RenderSurface,
    ) -> Result<()> {
        Ok(())
    }

    /// Called when the component is removed or its node destroyed
    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl dyn Component {
    /// Whether the concrete type is `T`
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to a concrete component
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete component, mutably
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// What a running hook can see: its owner, itself, and the graph
pub struct ComponentContext<'a> {
    graph: &'a mut SceneGraph,
    owner: NodeId,
    id: ComponentId,
    /// Device of an owner that no longer exists
    detached_device: Option<SharedDevice>,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(graph: &'a mut SceneGraph, owner: NodeId, id: ComponentId) -> Self {
        Self {
            graph,
            owner,
            id,
            detached_device: None,
        }
    }

    /// Context for a component whose owner was destroyed while it ran
    pub(crate) fn detached(
        graph: &'a mut SceneGraph,
        owner: NodeId,
        id: ComponentId,
        device: Option<SharedDevice>,
    ) -> Self {
        Self {
            graph,
            owner,
            id,
            detached_device: device,
        }
    }

    /// Node the component is attached to
    #[must_use]
    #[inline]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Id of the running component
    #[must_use]
    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The whole graph
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &*self.graph
    }

    /// The whole graph, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut *self.graph
    }

    /// Owning node
    pub fn node(&self) -> Result<&SceneNode> {
        self.graph.try_node(self.owner)
    }

    /// Owning node, mutably
    pub fn node_mut(&mut self) -> Result<&mut SceneNode> {
        self.graph.try_node_mut(self.owner)
    }

    /// Owning node's name, or an empty string if it is gone
    #[must_use]
    pub fn node_name(&self) -> &str {
        self.graph.node(self.owner).map_or("", SceneNode::name)
    }

    /// Owning node's transform
    pub fn transform(&self) -> Result<&Transform> {
        Ok(self.node()?.transform())
    }

    /// Owning node's transform, mutably
    pub fn transform_mut(&mut self) -> Result<&mut Transform> {
        Ok(self.node_mut()?.transform_mut())
    }

    /// World matrix of the owning node
    pub fn world_matrix(&self) -> Result<Matrix4> {
        self.graph.world_matrix(self.owner)
    }

    /// World-space position of the owning node
    pub fn world_position(&self) -> Result<Vector3> {
        self.graph.world_position(self.owner)
    }

    /// Buffer allocator of the owning node, if one was provided
    #[must_use]
    pub fn device(&self) -> Option<SharedDevice> {
        match self.graph.node(self.owner) {
            Some(node) => node.device(),
            None => self.detached_device.clone(),
        }
    }

    /// Device or a resource error naming the owning node
    pub fn require_device(&self) -> Result<SharedDevice> {
        self.device().ok_or_else(|| {
            EngineError::resource(
                "NO_DEVICE",
                format!("Node '{}' has no graphics device", self.node_name()),
            )
        })
    }

    /// First sibling component of type `T` on the owning node
    #[must_use]
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        self.graph.get_component::<T>(self.owner)
    }

    /// First sibling component of type `T` on the owning node, mutably
    pub fn sibling_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.graph.get_component_mut::<T>(self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;
    impl Component for Probe {}

    struct Named;
    impl Component for Named {
        fn kind(&self) -> &'static str {
            "Custom"
        }
    }

    #[test]
    fn test_default_kind_is_short_type_name() {
        assert_eq!(Probe.kind(), "Probe");
        assert_eq!(Named.kind(), "Custom");
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let mut boxed: Box<dyn Component> = Box::new(Probe);
        assert!(boxed.is::<Probe>());
        assert!(!boxed.is::<Named>());
        assert!(boxed.downcast_ref::<Probe>().is_some());
        assert!(boxed.downcast_mut::<Named>().is_none());
    }
}
