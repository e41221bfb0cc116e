#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod appearance;
pub mod diagnostics;
pub mod errors;
pub mod geometry;
pub mod scene;
pub mod settings;
pub mod sync;

pub use appearance::{Appearance, AttributeScope, AttributeType, AttributeValue, EffectiveAppearance};
pub use errors::{Result, SceneError};
pub use geometry::{Attribute, AttributeListSet, Category, DataList, Geometry, GeometryKind};
pub use scene::{
    Camera, Light, LightKind, PathObserver, SceneGraphComponent, SceneGraphNode, SceneGraphPath,
    SceneNode, Transformation,
};
pub use settings::{LockPolicy, SceneSettings, is_thread_safe, set_thread_safe};
pub use sync::SceneLock;
