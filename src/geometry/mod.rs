//! Geometry nodes and their per-element attribute lists.

pub mod attribute;
pub mod data_list;
#[allow(clippy::module_inception)]
pub mod geometry;
pub mod list_set;

pub use attribute::{Attribute, Category};
pub use data_list::DataList;
pub use geometry::{Geometry, GeometryKind};
pub use list_set::AttributeListSet;
