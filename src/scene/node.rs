//! Scene node storage
//!
//! A [`SceneNode`] is the data half of a game object: name, tag, transform,
//! component slots and child ids. Structural operations (attaching children,
//! running hooks, teardown) live on [`SceneGraph`](crate::scene::SceneGraph),
//! which owns every node.

use std::fmt;

use smallvec::SmallVec;

use crate::renderer::SharedDevice;
use crate::scene::{Component, ComponentId, Transform};

slotmap::new_key_type! {
    /// Handle to a node in a [`SceneGraph`](crate::scene::SceneGraph)
    pub struct NodeId;
}

/// Attached component plus its per-attachment state
pub(crate) struct ComponentSlot {
    /// Id issued on attach
    pub(crate) id: ComponentId,
    /// Disabled components are skipped by `start`, `update` and `render`
    pub(crate) enabled: bool,
    /// `None` while one of the component's own hooks is running
    pub(crate) component: Option<Box<dyn Component>>,
}

impl ComponentSlot {
    pub(crate) fn new(id: ComponentId, component: Box<dyn Component>) -> Self {
        Self {
            id,
            enabled: true,
            component: Some(component),
        }
    }
}

/// Named node in the scene tree
pub struct SceneNode {
    /// Display name, used in log messages
    name: String,
    /// Optional tag for lookups
    tag: Option<String>,
    /// Local transform
    transform: Transform,
    /// Attached components in insertion order
    pub(crate) components: Vec<ComponentSlot>,
    /// Child nodes in insertion order
    pub(crate) children: SmallVec<[NodeId; 8]>,
    /// Non-owning parent reference
    pub(crate) parent: Option<NodeId>,
    /// Inactive nodes skip update and render for their whole subtree
    active: bool,
    /// Buffer allocator handed to components on attach
    device: Option<SharedDevice>,
}

impl SceneNode {
    pub(crate) fn new(name: impl Into<String>, device: Option<SharedDevice>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            transform: Transform::new(),
            components: Vec::new(),
            children: SmallVec::new(),
            parent: None,
            active: true,
            device,
        }
    }

    /// Node name
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Tag, if one is set
    #[must_use]
    #[inline]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Set or clear the tag
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    /// Local transform
    #[must_use]
    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Local transform, mutably
    #[inline]
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Whether update and render reach this node
    #[must_use]
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Gate update and render for this node and its subtree
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Parent node, if attached
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in insertion order
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Attached component ids in insertion order
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|slot| slot.id)
    }

    /// Number of attached components
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Buffer allocator for this node's components
    #[must_use]
    pub fn device(&self) -> Option<SharedDevice> {
        self.device.clone()
    }

    /// Replace the buffer allocator; affects components attached afterwards
    pub fn set_device(&mut self, device: Option<SharedDevice>) {
        self.device = device;
    }

    pub(crate) fn slot(&self, id: ComponentId) -> Option<&ComponentSlot> {
        self.components.iter().find(|slot| slot.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: ComponentId) -> Option<&mut ComponentSlot> {
        self.components.iter_mut().find(|slot| slot.id == id)
    }

    /// Ids of enabled components, snapshotted for a traversal
    pub(crate) fn enabled_components(&self) -> SmallVec<[ComponentId; 8]> {
        self.components
            .iter()
            .filter(|slot| slot.enabled)
            .map(|slot| slot.id)
            .collect()
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("components", &self.components.len())
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("active", &self.active)
            .field("has_device", &self.device.is_some())
            .finish()
    }
}
