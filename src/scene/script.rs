//! Script component
//!
//! A property bag plus optional closures for the lifecycle hooks. Behavior
//! that needs its own state and types should implement
//! [`Component`](crate::scene::Component) directly; `Script` covers the
//! quick cases.
//!
//! ```
//! use diken::scene::{Script, ScriptValue, SceneGraph};
//!
//! let mut graph = SceneGraph::new();
//! let node = graph.create_node("Spinner");
//! let script = Script::new()
//!     .with_property("speed", 2.0)
//!     .with_update(|props, ctx, dt| {
//!         let speed = props.get("speed").and_then(ScriptValue::as_number).unwrap_or(0.0);
//!         ctx.transform_mut()?.rotate(0.0, speed as f32 * dt, 0.0)
//!     });
//! graph.add_component(node, Box::new(script)).unwrap();
//! graph.update(node, 0.5).unwrap();
//! assert_eq!(graph.node(node).unwrap().transform().rotation().y(), 1.0);
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::core::error::Result;
use crate::math::Vector3;
use crate::renderer::RenderSurface;
use crate::scene::{Component, ComponentContext};

/// Script property storage
pub type Properties = FxHashMap<String, ScriptValue>;

type LifecycleFn = Box<dyn FnMut(&mut Properties, &mut ComponentContext<'_>) -> Result<()>>;
type UpdateFn = Box<dyn FnMut(&mut Properties, &mut ComponentContext<'_>, f32) -> Result<()>>;
type RenderFn =
    Box<dyn FnMut(&mut Properties, &mut ComponentContext<'_>, &mut dyn RenderSurface) -> Result<()>>;

/// Dynamically typed script property
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// Boolean flag
    Bool(bool),
    /// Any number
    Number(f64),
    /// Text
    Text(String),
    /// 3D vector
    Vector(Vector3),
}

impl ScriptValue {
    /// Boolean value, if this is one
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value, if this is one
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text value, if this is one
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Vector value, if this is one
    #[must_use]
    pub fn as_vector(&self) -> Option<Vector3> {
        match self {
            Self::Vector(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for ScriptValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vector3> for ScriptValue {
    fn from(value: Vector3) -> Self {
        Self::Vector(value)
    }
}

/// User behavior built from closures
pub struct Script {
    /// Name reported in logs
    name: &'static str,
    /// Free-form properties
    properties: Properties,
    on_start: Option<LifecycleFn>,
    on_update: Option<UpdateFn>,
    on_render: Option<RenderFn>,
    on_destroy: Option<LifecycleFn>,
}

impl Script {
    /// Script with no properties and no behavior
    #[must_use]
    pub fn new() -> Self {
        Self::named("Script")
    }

    /// Script reported under `name` in logs
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            properties: Properties::default(),
            on_start: None,
            on_update: None,
            on_render: None,
            on_destroy: None,
        }
    }

    /// Add a property
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Run `f` from `start`
    #[must_use]
    pub fn with_start(
        mut self,
        f: impl FnMut(&mut Properties, &mut ComponentContext<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Run `f` every update
    #[must_use]
    pub fn with_update(
        mut self,
        f: impl FnMut(&mut Properties, &mut ComponentContext<'_>, f32) -> Result<()> + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    /// Run `f` every render
    #[must_use]
    pub fn with_render(
        mut self,
        f: impl FnMut(&mut Properties, &mut ComponentContext<'_>, &mut dyn RenderSurface) -> Result<()>
        + 'static,
    ) -> Self {
        self.on_render = Some(Box::new(f));
        self
    }

    /// Run `f` when the script is removed or its node destroyed
    #[must_use]
    pub fn with_destroy(
        mut self,
        f: impl FnMut(&mut Properties, &mut ComponentContext<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.on_destroy = Some(Box::new(f));
        self
    }

    /// All properties
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// All properties, mutably
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// One property
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&ScriptValue> {
        self.properties.get(key)
    }

    /// Insert or replace a property
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<ScriptValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Remove a property, returning its old value
    pub fn remove_property(&mut self, key: &str) -> Option<ScriptValue> {
        self.properties.remove(key)
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("on_start", &self.on_start.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_render", &self.on_render.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

impl Component for Script {
    fn kind(&self) -> &'static str {
        self.name
    }

    fn start(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
        match self.on_start.as_mut() {
            Some(hook) => hook(&mut self.properties, ctx),
            None => Ok(()),
        }
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<()> {
        match self.on_update.as_mut() {
            Some(hook) => hook(&mut self.properties, ctx, dt),
            None => Ok(()),
        }
    }

    fn render(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        surface: &mut dyn RenderSurface,
    ) -> Result<()> {
        match self.on_render.as_mut() {
            Some(hook) => hook(&mut self.properties, ctx, surface),
            None => Ok(()),
        }
    }

    fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
        match self.on_destroy.as_mut() {
            Some(hook) => hook(&mut self.properties, ctx),
            None => Ok(()),
        }
    }
}
