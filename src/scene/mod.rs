//! Scene graph
//!
//! Nodes live in a [`SceneGraph`] arena and carry a [`Transform`] plus any
//! number of [`Component`]s. A [`Scene`] wraps a graph with a root node and a
//! main camera and is what the frame driver updates and renders.

mod camera;
mod component;
mod graph;
mod mesh;
mod node;
mod scene;
mod script;
mod transform;

pub use camera::Camera;
pub use component::{AsAny, Component, ComponentContext, ComponentId};
pub use graph::SceneGraph;
pub use mesh::{CUBE_VERTICES, MeshKind, MeshRenderer};
pub use node::{NodeId, SceneNode};
pub use scene::{ROOT_NAME, Scene};
pub use script::{Properties, Script, ScriptValue};
pub use transform::Transform;
