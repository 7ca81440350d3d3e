//! Scene graph arena
//!
//! [`SceneGraph`] owns every [`SceneNode`] in a slot map and keeps an index
//! from each [`ComponentId`] to the node holding it. Parent and child links are
//! plain ids, so there is no shared ownership between nodes.
//!
//! Traversals (`update`, `render`, `destroy`) iterate snapshots of component
//! and child ids. Failures inside hooks or child subtrees are logged and
//! swallowed so the rest of the tree still runs. Attaching or detaching nodes
//! of a subtree while that subtree is being traversed is memory safe but the
//! resulting visit order is unspecified.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::core::error::{EngineError, Result, isolate};
use crate::math::{Matrix4, Vector3};
use crate::renderer::{RenderSurface, SharedDevice};
use crate::scene::node::ComponentSlot;
use crate::scene::{Camera, Component, ComponentContext, ComponentId, NodeId, SceneNode};

/// Arena of scene nodes and their components
#[derive(Default)]
pub struct SceneGraph {
    /// All nodes, attached or not
    nodes: SlotMap<NodeId, SceneNode>,
    /// Owning node of every attached component
    owners: SlotMap<ComponentId, NodeId>,
    /// Device given to newly created nodes
    device: Option<SharedDevice>,
    /// Components removed while one of their own hooks was running, with the
    /// device of the node they were on; torn down once the hook returns
    pending_destroy: FxHashMap<ComponentId, Option<SharedDevice>>,
}

impl SceneGraph {
    /// Create an empty graph without a device
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph whose nodes share `device`
    #[must_use]
    pub fn with_device(device: SharedDevice) -> Self {
        Self {
            device: Some(device),
            ..Self::default()
        }
    }

    /// Device handed to new nodes
    #[must_use]
    pub fn device(&self) -> Option<SharedDevice> {
        self.device.clone()
    }

    /// Replace the device handed to new nodes
    pub fn set_device(&mut self, device: Option<SharedDevice>) {
        self.device = device;
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Create a detached node
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let node = SceneNode::new(name, self.device.clone());
        let id = self.nodes.insert(node);
        log::debug!("Created node {id:?}");
        id
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Look up a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Look up a node or fail with `NodeNotFound`
    pub fn try_node(&self, id: NodeId) -> Result<&SceneNode> {
        self.nodes.get(id).ok_or(EngineError::NodeNotFound(id))
    }

    /// Look up a node mutably or fail with `NodeNotFound`
    pub fn try_node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode> {
        self.nodes.get_mut(id).ok_or(EngineError::NodeNotFound(id))
    }

    /// Whether `id` refers to a live node
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gate update and render for a node and its subtree
    pub fn set_active(&mut self, id: NodeId, active: bool) -> Result<()> {
        self.try_node_mut(id)?.set_active(active);
        Ok(())
    }

    /// Set or clear a node's tag
    pub fn set_tag(&mut self, id: NodeId, tag: Option<&str>) -> Result<()> {
        self.try_node_mut(id)?.set_tag(tag.map(str::to_owned));
        Ok(())
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Attach `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is detached from it first. Attaching
    /// a node under itself or under one of its descendants fails with
    /// `HierarchyCycle`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.try_node(parent)?;
        self.try_node(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(EngineError::HierarchyCycle { parent, child });
        }

        if let Some(old_parent) = self.nodes[child].parent {
            self.remove_child(old_parent, child);
        }

        self.nodes[parent].children.push(child);
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.transform_mut().set_parent(Some(parent));
        Ok(())
    }

    /// Detach `child` from `parent`; returns false if it was not a child
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return false;
        };
        let Some(pos) = parent_node.children.iter().position(|&c| c == child) else {
            return false;
        };
        parent_node.children.remove(pos);

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
            node.transform_mut().set_parent(None);
        }
        true
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.nodes.get(id).and_then(SceneNode::parent);
        }
        false
    }

    // =========================================================================
    // Matrices
    // =========================================================================

    /// Local matrix of a node
    pub fn local_matrix(&self, id: NodeId) -> Result<Matrix4> {
        Ok(self.try_node(id)?.transform().local_matrix())
    }

    /// World matrix: the parent's world matrix times the local matrix.
    ///
    /// Recomputed through the whole parent chain on every call.
    pub fn world_matrix(&self, id: NodeId) -> Result<Matrix4> {
        let node = self.try_node(id)?;
        let mut world = node.transform().local_matrix();
        let mut current = node.parent();
        let mut steps = 0;

        while let Some(parent_id) = current {
            steps += 1;
            if steps > self.nodes.len() {
                return Err(EngineError::HierarchyCycle {
                    parent: parent_id,
                    child: id,
                });
            }
            let parent = self.try_node(parent_id)?;
            world = parent.transform().local_matrix().multiply(&world);
            current = parent.parent();
        }
        Ok(world)
    }

    /// Translation part of the world matrix
    pub fn world_position(&self, id: NodeId) -> Result<Vector3> {
        let [x, y, z] = self.world_matrix(id)?.translation();
        Vector3::new(x, y, z)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attach a component and run its `awake` hook.
    ///
    /// A failing `awake` is logged; the component stays attached.
    pub fn add_component(
        &mut self,
        node: NodeId,
        component: Box<dyn Component>,
    ) -> Result<ComponentId> {
        self.try_node(node)?;
        let id = self.owners.insert(node);
        let kind = component.as_ref().kind();
        self.nodes[node]
            .components
            .push(ComponentSlot::new(id, component));
        log::debug!("Attached {kind} to '{}'", self.nodes[node].name());

        let result = self.with_component(id, |component, ctx| component.awake(ctx));
        isolate(result, || self.failure_scope(id, "awake"));
        Ok(id)
    }

    /// Detach a component, running its `on_destroy` hook first.
    ///
    /// Returns `None` if the id is not attached. A component removed from
    /// inside one of its own hooks is also `None`: its `on_destroy` runs as
    /// soon as that hook returns, and it is dropped afterwards.
    pub fn remove_component(&mut self, id: ComponentId) -> Option<Box<dyn Component>> {
        let owner = *self.owners.get(id)?;

        let running = self
            .nodes
            .get(owner)
            .and_then(|node| node.slot(id))
            .is_some_and(|slot| slot.component.is_none());
        if running {
            let device = self.nodes.get(owner).and_then(SceneNode::device);
            self.pending_destroy.insert(id, device);
        } else {
            let result = self.with_component(id, |component, ctx| component.on_destroy(ctx));
            isolate(result, || self.failure_scope(id, "on_destroy"));
        }

        self.owners.remove(id);
        let node = self.nodes.get_mut(owner)?;
        let pos = node.components.iter().position(|slot| slot.id == id)?;
        node.components.remove(pos).component
    }

    /// Node a component is attached to
    #[must_use]
    pub fn owner_of(&self, id: ComponentId) -> Option<NodeId> {
        self.owners.get(id).copied()
    }

    /// Enable or disable a component
    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) -> Result<()> {
        let owner = self.owner_of(id).ok_or(EngineError::ComponentNotFound(id))?;
        let slot = self
            .try_node_mut(owner)?
            .slot_mut(id)
            .ok_or(EngineError::ComponentNotFound(id))?;
        slot.enabled = enabled;
        Ok(())
    }

    /// Whether a component is attached and enabled
    #[must_use]
    pub fn is_component_enabled(&self, id: ComponentId) -> bool {
        self.owner_of(id)
            .and_then(|owner| self.nodes.get(owner))
            .and_then(|node| node.slot(id))
            .is_some_and(|slot| slot.enabled)
    }

    /// Concrete component by id
    #[must_use]
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        let owner = self.owner_of(id)?;
        self.nodes
            .get(owner)?
            .slot(id)?
            .component
            .as_deref()?
            .downcast_ref::<T>()
    }

    /// Concrete component by id, mutably
    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        let owner = self.owner_of(id)?;
        self.nodes
            .get_mut(owner)?
            .slot_mut(id)?
            .component
            .as_deref_mut()?
            .downcast_mut::<T>()
    }

    /// Component by id as a trait object
    #[must_use]
    pub fn component_dyn(&self, id: ComponentId) -> Option<&dyn Component> {
        let owner = self.owner_of(id)?;
        self.nodes.get(owner)?.slot(id)?.component.as_deref()
    }

    /// First component of type `T` on a node
    #[must_use]
    pub fn get_component<T: Component>(&self, node: NodeId) -> Option<&T> {
        self.nodes
            .get(node)?
            .components
            .iter()
            .find_map(|slot| slot.component.as_deref()?.downcast_ref::<T>())
    }

    /// First component of type `T` on a node, mutably
    pub fn get_component_mut<T: Component>(&mut self, node: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(node)?
            .components
            .iter_mut()
            .find_map(|slot| slot.component.as_deref_mut()?.downcast_mut::<T>())
    }

    /// Id of the first component of type `T` on a node
    #[must_use]
    pub fn get_component_id<T: Component>(&self, node: NodeId) -> Option<ComponentId> {
        self.nodes.get(node)?.components.iter().find_map(|slot| {
            slot.component
                .as_deref()
                .filter(|component| component.is::<T>())
                .map(|_| slot.id)
        })
    }

    /// All components of type `T` on a node, in attach order
    #[must_use]
    pub fn get_components<T: Component>(&self, node: NodeId) -> Vec<&T> {
        self.nodes.get(node).map_or_else(Vec::new, |node| {
            node.components
                .iter()
                .filter_map(|slot| slot.component.as_deref()?.downcast_ref::<T>())
                .collect()
        })
    }

    /// Run `start` on every enabled component of a node
    pub fn start_components(&mut self, node: NodeId) -> Result<()> {
        let ids = self.try_node(node)?.enabled_components();
        for id in ids {
            let result = self.with_component(id, |component, ctx| component.start(ctx));
            isolate(result, || self.failure_scope(id, "start"));
        }
        Ok(())
    }

    /// Model-view-projection for a camera component, using its owner's world position
    pub fn camera_mvp(&mut self, camera: ComponentId, model: &Matrix4) -> Result<Matrix4> {
        let owner = self.owner_of(camera).ok_or(EngineError::ComponentNotFound(camera))?;
        let eye = self.world_position(owner)?;
        let camera = self.component_mut::<Camera>(camera).ok_or_else(|| {
            EngineError::validation("INVALID_CAMERA_TYPE", "Component is not a Camera")
        })?;
        camera.mvp_matrix(eye, model)
    }

    /// Detach a component, hand it and a context to `f`, then put it back
    fn with_component<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn Component, &mut ComponentContext<'_>) -> Result<R>,
    ) -> Result<R> {
        let owner = self.owner_of(id).ok_or(EngineError::ComponentNotFound(id))?;
        let mut component = self
            .try_node_mut(owner)?
            .slot_mut(id)
            .and_then(|slot| slot.component.take())
            .ok_or_else(|| {
                EngineError::resource(
                    "COMPONENT_BUSY",
                    format!("Component {id:?} is already running a hook"),
                )
            })?;

        let result = {
            let mut ctx = ComponentContext::new(self, owner, id);
            f(component.as_mut(), &mut ctx)
        };

        let slot = self
            .owner_of(id)
            .and_then(|owner| self.nodes.get_mut(owner))
            .and_then(|node| node.slot_mut(id));
        if let Some(slot) = slot {
            slot.component = Some(component);
            return result;
        }

        match self.pending_destroy.remove(&id) {
            Some(device) => {
                let kind = component.as_ref().kind();
                let teardown = {
                    let mut ctx = ComponentContext::detached(self, owner, id, device);
                    component.on_destroy(&mut ctx)
                };
                isolate(teardown, || format!("{kind}.on_destroy failed after removal"));
            }
            None => log::warn!(
                "{} was removed during its own hook and has been dropped",
                component.as_ref().kind()
            ),
        }
        result
    }

    /// "Kind on 'name' failed in hook" for log messages
    fn failure_scope(&self, id: ComponentId, hook: &str) -> String {
        let kind = self.component_dyn(id).map_or("Component", |c| c.kind());
        let name = self
            .owner_of(id)
            .and_then(|owner| self.nodes.get(owner))
            .map_or("<removed>", SceneNode::name);
        format!("{kind}.{hook} failed on '{name}'")
    }

    fn node_label(&self, id: NodeId) -> String {
        self.nodes
            .get(id)
            .map_or_else(|| format!("{id:?}"), |node| format!("'{}'", node.name()))
    }

    // =========================================================================
    // Traversals
    // =========================================================================

    /// Run `update` on a node's enabled components, then on its children.
    ///
    /// Non-finite `dt` is logged and ignored. Inactive nodes return before
    /// any hook runs.
    pub fn update(&mut self, id: NodeId, dt: f32) -> Result<()> {
        if !dt.is_finite() {
            log::warn!("Update skipped: delta time must be a finite number, got {dt}");
            return Ok(());
        }
        let node = self.try_node(id)?;
        if !node.is_active() {
            return Ok(());
        }
        let ids = node.enabled_components();
        let children: SmallVec<[NodeId; 8]> = node.children.clone();

        for component in ids {
            let result = self.with_component(component, |c, ctx| c.update(ctx, dt));
            isolate(result, || self.failure_scope(component, "update"));
        }
        for child in children {
            let result = self.update(child, dt);
            isolate(result, || {
                format!("Update of child {} under {}", self.node_label(child), self.node_label(id))
            });
        }
        Ok(())
    }

    /// Run `render` on a node's enabled components, then on its children
    pub fn render(&mut self, id: NodeId, surface: &mut dyn RenderSurface) -> Result<()> {
        let node = self.try_node(id)?;
        if !node.is_active() {
            return Ok(());
        }
        let ids = node.enabled_components();
        let children: SmallVec<[NodeId; 8]> = node.children.clone();

        for component in ids {
            let result = self.with_component(component, |c, ctx| c.render(ctx, &mut *surface));
            isolate(result, || self.failure_scope(component, "render"));
        }
        for child in children {
            let result = self.render(child, &mut *surface);
            isolate(result, || {
                format!("Render of child {} under {}", self.node_label(child), self.node_label(id))
            });
        }
        Ok(())
    }

    /// Tear down a node and its subtree.
    ///
    /// Runs `on_destroy` on every component (active or not), destroys every
    /// child, detaches the node from its parent and removes it from the arena.
    /// The id is stale afterwards.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        let node = self.try_node(id)?;
        let components: SmallVec<[ComponentId; 8]> = node.component_ids().collect();
        let children: SmallVec<[NodeId; 8]> = node.children.clone();
        let label = self.node_label(id);

        for component in components {
            self.remove_component(component);
        }
        for child in children {
            let result = self.destroy(child);
            isolate(result, || format!("Destroy of child {} under {label}", self.node_label(child)));
        }

        if let Some(parent) = self.nodes.get(id).and_then(SceneNode::parent) {
            self.remove_child(parent, id);
        }
        self.nodes.remove(id);
        log::debug!("Destroyed node {label}");
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First node with `tag` in depth-first pre-order from `start`
    #[must_use]
    pub fn find_with_tag(&self, start: NodeId, tag: &str) -> Option<NodeId> {
        self.preorder(start)
            .find(|&id| self.nodes.get(id).and_then(SceneNode::tag) == Some(tag))
    }

    /// All nodes with `tag` in depth-first pre-order from `start`
    #[must_use]
    pub fn find_all_with_tag(&self, start: NodeId, tag: &str) -> Vec<NodeId> {
        self.preorder(start)
            .filter(|&id| self.nodes.get(id).and_then(SceneNode::tag) == Some(tag))
            .collect()
    }

    /// Depth-first pre-order walk starting at (and including) `start`
    pub fn preorder(&self, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = Vec::new();
        if self.nodes.contains_key(start) {
            stack.push(start);
        }
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
            Some(id)
        })
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("components", &self.owners.len())
            .field("has_device", &self.device.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::renderer::{BufferHandle, HeadlessBackend, Renderer};

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook call as "label:hook"; optionally fails a hook
    struct Spy {
        label: &'static str,
        log: Log,
        fail_on: Option<&'static str>,
    }

    impl Spy {
        fn boxed(label: &'static str, log: &Log) -> Box<Self> {
            Box::new(Self {
                label,
                log: Rc::clone(log),
                fail_on: None,
            })
        }

        fn failing(label: &'static str, log: &Log, hook: &'static str) -> Box<Self> {
            Box::new(Self {
                label,
                log: Rc::clone(log),
                fail_on: Some(hook),
            })
        }

        fn record(&self, hook: &'static str) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:{hook}", self.label));
            if self.fail_on == Some(hook) {
                Err(EngineError::validation("SPY_FAILURE", hook))
            } else {
                Ok(())
            }
        }
    }

    impl Component for Spy {
        fn awake(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
            self.record("awake")
        }

        fn start(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
            self.record("start")
        }

        fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<()> {
            self.record("update")
        }

        fn render(
            &mut self,
            _ctx: &mut ComponentContext<'_>,
            _surface: &mut dyn RenderSurface,
        ) -> Result<()> {
            self.record("render")
        }

        fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
            self.record("destroy")
        }
    }

    struct Marker;
    impl Component for Marker {}

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_add_child_sets_both_parent_references() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("Parent");
        let child = graph.create_node("Child");

        graph.add_child(parent, child).unwrap();
        assert_eq!(graph.node(parent).unwrap().children(), &[child]);
        assert_eq!(graph.node(child).unwrap().parent(), Some(parent));
        assert_eq!(graph.node(child).unwrap().transform().parent(), Some(parent));

        assert!(graph.remove_child(parent, child));
        assert!(graph.node(parent).unwrap().children().is_empty());
        assert_eq!(graph.node(child).unwrap().parent(), None);
        assert_eq!(graph.node(child).unwrap().transform().parent(), None);

        // Not a child any more
        assert!(!graph.remove_child(parent, child));
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        let child = graph.create_node("Child");

        graph.add_child(a, child).unwrap();
        graph.add_child(b, child).unwrap();
        assert!(graph.node(a).unwrap().children().is_empty());
        assert_eq!(graph.node(b).unwrap().children(), &[child]);
        assert_eq!(graph.node(child).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        let c = graph.create_node("C");
        graph.add_child(a, b).unwrap();
        graph.add_child(b, c).unwrap();

        let err = graph.add_child(c, a).unwrap_err();
        assert_eq!(err, EngineError::HierarchyCycle { parent: c, child: a });
        assert_eq!(graph.add_child(a, a).unwrap_err().code(), "HIERARCHY_CYCLE");
        assert_eq!(graph.node(a).unwrap().parent(), None);
    }

    #[test]
    fn test_world_matrix_composes_parent_chain() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("Parent");
        let child = graph.create_node("Child");
        graph.add_child(parent, child).unwrap();

        graph
            .node_mut(parent)
            .unwrap()
            .transform_mut()
            .translate(1.0, 0.0, 0.0)
            .unwrap();
        graph
            .node_mut(child)
            .unwrap()
            .transform_mut()
            .translate(0.0, 2.0, 0.0)
            .unwrap();

        let world = graph.world_matrix(child).unwrap();
        assert_eq!(world.translation(), [1.0, 2.0, 0.0]);

        let expected = graph
            .local_matrix(parent)
            .unwrap()
            .multiply(&graph.local_matrix(child).unwrap());
        assert!(world.approx_eq(&expected, 1e-6));
    }

    #[test]
    fn test_world_matrix_tracks_parent_changes() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("Parent");
        let child = graph.create_node("Child");
        graph.add_child(parent, child).unwrap();
        assert_eq!(graph.world_position(child).unwrap(), Vector3::ZERO);

        graph
            .node_mut(parent)
            .unwrap()
            .transform_mut()
            .translate(0.0, 0.0, -5.0)
            .unwrap();
        assert_eq!(
            graph.world_position(child).unwrap(),
            Vector3::new(0.0, 0.0, -5.0).unwrap()
        );

        graph.remove_child(parent, child);
        assert_eq!(graph.world_position(child).unwrap(), Vector3::ZERO);
    }

    #[test]
    fn test_add_component_runs_awake_and_tolerates_failure() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");

        let ok = graph.add_component(node, Spy::boxed("a", &log)).unwrap();
        let bad = graph
            .add_component(node, Spy::failing("b", &log, "awake"))
            .unwrap();

        assert_eq!(entries(&log), ["a:awake", "b:awake"]);
        assert_eq!(graph.owner_of(ok), Some(node));
        assert_eq!(graph.owner_of(bad), Some(node));
        assert_eq!(graph.node(node).unwrap().component_count(), 2);
    }

    #[test]
    fn test_get_component_by_type() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        let first = graph.add_component(node, Spy::boxed("a", &log)).unwrap();
        graph.add_component(node, Box::new(Marker)).unwrap();
        graph.add_component(node, Spy::boxed("b", &log)).unwrap();

        assert_eq!(graph.get_component::<Spy>(node).unwrap().label, "a");
        assert_eq!(graph.get_components::<Spy>(node).len(), 2);
        assert_eq!(graph.get_components::<Marker>(node).len(), 1);
        assert_eq!(graph.get_component_id::<Spy>(node), Some(first));
        assert!(graph.get_component::<Camera>(node).is_none());
        assert!(graph.component::<Marker>(first).is_none());
    }

    #[test]
    fn test_remove_component_runs_on_destroy_and_clears_owner() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        let id = graph
            .add_component(node, Spy::failing("a", &log, "destroy"))
            .unwrap();

        let removed = graph.remove_component(id);
        assert!(removed.is_some());
        assert_eq!(entries(&log), ["a:awake", "a:destroy"]);
        assert_eq!(graph.owner_of(id), None);
        assert_eq!(graph.node(node).unwrap().component_count(), 0);

        // Second removal is a no-op
        assert!(graph.remove_component(id).is_none());
        assert_eq!(entries(&log).len(), 2);
    }

    #[test]
    fn test_update_isolates_failing_component() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let root = graph.create_node("Root");
        let child = graph.create_node("Child");
        graph.add_child(root, child).unwrap();

        graph.add_component(root, Spy::boxed("c1", &log)).unwrap();
        graph
            .add_component(root, Spy::failing("c2", &log, "update"))
            .unwrap();
        graph.add_component(root, Spy::boxed("c3", &log)).unwrap();
        graph.add_component(child, Spy::boxed("c4", &log)).unwrap();
        log.borrow_mut().clear();

        graph.update(root, 0.016).unwrap();
        assert_eq!(
            entries(&log),
            ["c1:update", "c2:update", "c3:update", "c4:update"]
        );
    }

    #[test]
    fn test_render_isolates_failing_component() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let root = graph.create_node("Root");
        let child = graph.create_node("Child");
        graph.add_child(root, child).unwrap();
        graph
            .add_component(root, Spy::failing("c1", &log, "render"))
            .unwrap();
        graph.add_component(child, Spy::boxed("c2", &log)).unwrap();
        log.borrow_mut().clear();

        let mut renderer = Renderer::new(HeadlessBackend::new());
        graph.render(root, &mut renderer).unwrap();
        assert_eq!(entries(&log), ["c1:render", "c2:render"]);
    }

    #[test]
    fn test_inactive_node_skips_subtree() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let root = graph.create_node("Root");
        let child = graph.create_node("Child");
        graph.add_child(root, child).unwrap();
        graph.add_component(root, Spy::boxed("root", &log)).unwrap();
        graph.add_component(child, Spy::boxed("child", &log)).unwrap();
        log.borrow_mut().clear();

        graph.set_active(root, false).unwrap();
        graph.update(root, 0.016).unwrap();
        let mut renderer = Renderer::new(HeadlessBackend::new());
        graph.render(root, &mut renderer).unwrap();
        assert!(entries(&log).is_empty());

        graph.set_active(root, true).unwrap();
        graph.set_active(child, false).unwrap();
        graph.update(root, 0.016).unwrap();
        assert_eq!(entries(&log), ["root:update"]);
    }

    #[test]
    fn test_disabled_component_is_skipped() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        let id = graph.add_component(node, Spy::boxed("a", &log)).unwrap();
        log.borrow_mut().clear();

        graph.set_component_enabled(id, false).unwrap();
        assert!(!graph.is_component_enabled(id));
        graph.update(node, 0.016).unwrap();
        graph.start_components(node).unwrap();
        assert!(entries(&log).is_empty());

        graph.set_component_enabled(id, true).unwrap();
        graph.start_components(node).unwrap();
        assert_eq!(entries(&log), ["a:start"]);
    }

    #[test]
    fn test_non_finite_dt_is_ignored() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        graph.add_component(node, Spy::boxed("a", &log)).unwrap();
        log.borrow_mut().clear();

        graph.update(node, f32::NAN).unwrap();
        graph.update(node, f32::INFINITY).unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_destroy_tears_down_every_child() {
        let log = new_log();
        let mut graph = SceneGraph::new();
        let root = graph.create_node("Root");
        let parent = graph.create_node("Parent");
        graph.add_child(root, parent).unwrap();

        let labels = ["k1", "k2", "k3", "k4"];
        let mut kids = Vec::new();
        for label in labels {
            let kid = graph.create_node(label);
            graph.add_child(parent, kid).unwrap();
            graph.add_component(kid, Spy::boxed(label, &log)).unwrap();
            kids.push(kid);
        }
        graph
            .add_component(parent, Spy::failing("p", &log, "destroy"))
            .unwrap();
        graph.set_active(parent, false).unwrap();
        log.borrow_mut().clear();

        graph.destroy(parent).unwrap();
        assert_eq!(
            entries(&log),
            ["p:destroy", "k1:destroy", "k2:destroy", "k3:destroy", "k4:destroy"]
        );
        assert!(!graph.contains(parent));
        assert!(kids.iter().all(|&kid| !graph.contains(kid)));
        assert!(graph.node(root).unwrap().children().is_empty());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_stale_ids() {
        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        graph.destroy(node).unwrap();

        assert_eq!(graph.update(node, 0.1).unwrap_err(), EngineError::NodeNotFound(node));
        assert!(graph.world_matrix(node).is_err());
        assert!(graph.add_component(node, Box::new(Marker)).is_err());
    }

    #[test]
    fn test_find_with_tag_is_preorder() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node("Root");
        let a = graph.create_node("A");
        let a_child = graph.create_node("AChild");
        let b = graph.create_node("B");
        graph.add_child(root, a).unwrap();
        graph.add_child(a, a_child).unwrap();
        graph.add_child(root, b).unwrap();

        graph.set_tag(b, Some("Enemy")).unwrap();
        graph.set_tag(a_child, Some("Enemy")).unwrap();
        graph.set_tag(a, Some("Enemy")).unwrap();

        assert_eq!(graph.find_with_tag(root, "Enemy"), Some(a));
        assert_eq!(graph.find_all_with_tag(root, "Enemy"), vec![a, a_child, b]);
        assert_eq!(graph.find_with_tag(root, "Player"), None);
        assert_eq!(
            graph.preorder(root).collect::<Vec<_>>(),
            vec![root, a, a_child, b]
        );
    }

    #[test]
    fn test_hooks_see_owner_through_context() {
        struct Mover;
        impl Component for Mover {
            fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<()> {
                ctx.transform_mut()?.translate(dt, 0.0, 0.0)
            }
        }

        let mut graph = SceneGraph::new();
        let node = graph.create_node("Node");
        graph.add_component(node, Box::new(Mover)).unwrap();
        graph.update(node, 0.5).unwrap();
        graph.update(node, 0.5).unwrap();
        assert_eq!(graph.world_position(node).unwrap().x(), 1.0);
    }

    #[test]
    fn test_nodes_inherit_graph_device() {
        let backend: Rc<RefCell<HeadlessBackend>> = Rc::new(RefCell::new(HeadlessBackend::new()));
        let device: SharedDevice = backend.clone();
        let mut graph = SceneGraph::with_device(device);
        let node = graph.create_node("Node");

        let device = graph.node(node).unwrap().device().unwrap();
        device.borrow_mut().create_buffer().unwrap();
        assert_eq!(backend.borrow().live_buffers(), 1);
    }

    /// Owns a buffer and tears its own node down on the first update
    struct SelfDestruct {
        log: Log,
        buffer: Option<BufferHandle>,
        remove_only: bool,
    }

    impl Component for SelfDestruct {
        fn awake(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
            let device = ctx.require_device()?;
            self.buffer = Some(device.borrow_mut().create_buffer()?);
            Ok(())
        }

        fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<()> {
            let (owner, id) = (ctx.owner(), ctx.id());
            if self.remove_only {
                assert!(ctx.graph_mut().remove_component(id).is_none());
                Ok(())
            } else {
                ctx.graph_mut().destroy(owner)
            }
        }

        fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
            self.log.borrow_mut().push(format!("destroy:{}", ctx.node_name()));
            if let (Some(buffer), Some(device)) = (self.buffer.take(), ctx.device()) {
                device.borrow_mut().delete_buffer(buffer);
            }
            Ok(())
        }
    }

    fn device_graph() -> (Rc<RefCell<HeadlessBackend>>, SceneGraph) {
        let backend = Rc::new(RefCell::new(HeadlessBackend::new()));
        let device: SharedDevice = backend.clone();
        (backend, SceneGraph::with_device(device))
    }

    #[test]
    fn test_destroying_own_node_from_update_runs_on_destroy() {
        let (backend, mut graph) = device_graph();
        let log = new_log();
        let node = graph.create_node("Doomed");
        let child = graph.create_node("Child");
        graph.add_child(node, child).unwrap();
        graph.add_component(child, Spy::boxed("child", &log)).unwrap();
        let id = graph
            .add_component(
                node,
                Box::new(SelfDestruct {
                    log: Rc::clone(&log),
                    buffer: None,
                    remove_only: false,
                }),
            )
            .unwrap();
        assert_eq!(backend.borrow().live_buffers(), 1);
        log.borrow_mut().clear();

        graph.update(node, 0.016).unwrap();

        assert!(!graph.contains(node));
        assert!(!graph.contains(child));
        assert!(graph.owner_of(id).is_none());
        // The detached owner has no name left
        assert_eq!(entries(&log), ["child:destroy", "destroy:"]);
        assert_eq!(backend.borrow().live_buffers(), 0);
    }

    #[test]
    fn test_removing_self_from_update_runs_on_destroy_after_hook() {
        let (backend, mut graph) = device_graph();
        let log = new_log();
        let node = graph.create_node("Host");
        let id = graph
            .add_component(
                node,
                Box::new(SelfDestruct {
                    log: Rc::clone(&log),
                    buffer: None,
                    remove_only: true,
                }),
            )
            .unwrap();

        graph.update(node, 0.016).unwrap();

        assert!(graph.contains(node));
        assert_eq!(graph.node(node).unwrap().component_count(), 0);
        assert!(graph.component_dyn(id).is_none());
        assert_eq!(entries(&log), ["destroy:Host"]);
        assert_eq!(backend.borrow().live_buffers(), 0);

        // Nothing is left to tear down a second time
        graph.update(node, 0.016).unwrap();
        assert_eq!(entries(&log).len(), 1);
    }
}
