//! Change events delivered to listeners at the end of a write batch.

use std::sync::Arc;

use bitflags::bitflags;
use glam::DMat4;

use crate::appearance::{Appearance, AttributeValue};
use crate::geometry::{Attribute, Geometry};
use crate::scene::audio::{AudioSource, PlaybackState};
use crate::scene::camera::Camera;
use crate::scene::component::SceneGraphComponent;
use crate::scene::light::Light;
use crate::scene::node::SceneNode;
use crate::scene::tool::Tool;
use crate::scene::transformation::Transformation;

// ============================================================================
// Component events
// ============================================================================

/// Slot or list of a component that an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildType {
    Transformation,
    Appearance,
    Camera,
    Light,
    Geometry,
    AudioSource,
    Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentEventKind {
    ChildAdded,
    ChildRemoved,
    ChildReplaced,
    VisibilityChanged,
    PickabilityChanged,
}

/// Structural change of a [`SceneGraphComponent`].
#[derive(Debug, Clone)]
pub struct ComponentEvent {
    pub source: Arc<SceneGraphComponent>,
    pub kind: ComponentEventKind,
    /// `None` for visibility and pickability changes
    pub child_type: Option<ChildType>,
    pub old_child: Option<SceneNode>,
    pub new_child: Option<SceneNode>,
    /// Position in the child list, for child components
    pub index: Option<usize>,
}

/// Receives structural changes of a component. Each event kind is routed to
/// its own callback.
pub trait ComponentListener: Send + Sync {
    fn child_added(&self, _event: &ComponentEvent) {}
    fn child_removed(&self, _event: &ComponentEvent) {}
    fn child_replaced(&self, _event: &ComponentEvent) {}
    fn visibility_changed(&self, _event: &ComponentEvent) {}
    fn pickability_changed(&self, _event: &ComponentEvent) {}
}

/// A tool was added to or removed from a component's tool list.
#[derive(Debug, Clone)]
pub struct ToolEvent {
    pub source: Arc<SceneGraphComponent>,
    pub tool: Arc<dyn Tool>,
    pub added: bool,
}

pub trait ToolListener: Send + Sync {
    fn tool_added(&self, _event: &ToolEvent) {}
    fn tool_removed(&self, _event: &ToolEvent) {}
}

// ============================================================================
// Leaf events
// ============================================================================

/// One attribute of an [`Appearance`] changed. `old_value` is the value the
/// key had before the batch started.
#[derive(Debug, Clone)]
pub struct AppearanceEvent {
    pub source: Arc<Appearance>,
    pub key: String,
    pub old_value: AttributeValue,
}

#[derive(Debug, Clone)]
pub struct TransformationEvent {
    pub source: Arc<Transformation>,
    pub matrix: DMat4,
}

bitflags! {
    /// Categories of a geometry touched during one batch.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GeometryChanges: u32 {
        const VERTEX   = 1 << 0;
        const EDGE     = 1 << 1;
        const FACE     = 1 << 2;
        const GEOMETRY = 1 << 3;
    }
}

/// All changes of a [`Geometry`] made in one batch, merged into one event.
#[derive(Debug, Clone)]
pub struct GeometryEvent {
    pub source: Arc<Geometry>,
    pub changes: GeometryChanges,
    pub vertex_attributes: Vec<Attribute>,
    pub edge_attributes: Vec<Attribute>,
    pub face_attributes: Vec<Attribute>,
    pub geometry_attributes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LightEvent {
    pub source: Arc<Light>,
}

#[derive(Debug, Clone)]
pub struct CameraEvent {
    pub source: Arc<Camera>,
}

#[derive(Debug, Clone)]
pub struct AudioEvent {
    pub source: Arc<AudioSource>,
    pub state: PlaybackState,
}
