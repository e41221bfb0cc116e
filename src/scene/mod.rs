//! Scene graph nodes and their structure.
//!
//! - Node: shared node core, batching and the closed [`SceneNode`] set
//! - SceneGraphComponent: composite node with slots, children and tools
//! - Transformation, Camera, Light, AudioSource: leaf nodes
//! - SceneGraphPath: root-to-node paths and matrix composition
//! - PathObserver: change tracking along a path

#[macro_use]
mod macros;

pub mod audio;
pub mod camera;
pub mod component;
pub mod events;
pub mod light;
pub mod listeners;
pub mod node;
pub mod path;
pub mod path_observer;
pub mod tool;
pub mod transformation;
pub mod traversal;

pub use audio::{AudioSource, PlaybackState};
pub use camera::Camera;
pub use component::SceneGraphComponent;
pub use events::{
    AppearanceEvent, AudioEvent, CameraEvent, ChildType, ComponentEvent, ComponentEventKind,
    ComponentListener, GeometryChanges, GeometryEvent, LightEvent, ToolEvent, ToolListener,
    TransformationEvent,
};
pub use light::{Light, LightKind};
pub use listeners::ListenerId;
pub use node::{NodeCore, NodeKind, SceneGraphNode, SceneNode, WriteBatch};
pub use path::SceneGraphPath;
pub use path_observer::{PathEvent, PathObserver};
pub use tool::Tool;
pub use transformation::Transformation;
pub use traversal::{SceneGraphVisitor, paths_between, run_as_writers, traverse};
