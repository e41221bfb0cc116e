//! Appearance attributes and their inheritance.
//!
//! - [`Appearance`]: string-keyed attribute container node
//! - [`AttributeValue`]: stored values and the `Inherited` / `Default` sentinels
//! - [`EffectiveAppearance`]: inheritance-aware lookup along a path
//! - [`AttributeScope`]: prefixed reader over an effective appearance

#[allow(clippy::module_inception)]
pub mod appearance;
pub mod effective;
pub mod scope;
pub mod value;

pub use appearance::Appearance;
pub use effective::EffectiveAppearance;
pub use scope::AttributeScope;
pub use value::{AttributeType, AttributeValue, ObjectValue};
