//! Prefixed views over an effective appearance.
//!
//! Shaders and other consumers usually read a group of keys sharing a
//! prefix (`"polygonShader.diffuseColor"`, `"polygonShader.specularColor"`,
//! ...). An [`AttributeScope`] binds the prefix once and resolves the short
//! names through the full inheritance rules.
//!
//! A scope is a reader, not a value: storing one in an
//! [`Appearance`](super::Appearance) is rejected.

use std::sync::Arc;

use glam::Vec4;

use crate::appearance::effective::EffectiveAppearance;
use crate::appearance::value::{AttributeType, AttributeValue};

#[derive(Debug, Clone)]
pub struct AttributeScope {
    appearance: Arc<EffectiveAppearance>,
    prefix: String,
}

impl AttributeScope {
    #[must_use]
    pub fn new(appearance: Arc<EffectiveAppearance>, prefix: &str) -> Self {
        Self {
            appearance,
            prefix: prefix.trim_end_matches('.').to_string(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn effective_appearance(&self) -> &Arc<EffectiveAppearance> {
        &self.appearance
    }

    /// Full key for `name` inside this scope.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    /// Nested scope, e.g. `polygonShader` → `polygonShader.textureShader`.
    #[must_use]
    pub fn sub_scope(&self, name: &str) -> AttributeScope {
        AttributeScope {
            appearance: Arc::clone(&self.appearance),
            prefix: self.key(name),
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str, default: AttributeValue) -> AttributeValue {
        self.appearance.attribute(&self.key(name), default)
    }

    #[must_use]
    pub fn attribute_typed(
        &self,
        name: &str,
        default: AttributeValue,
        ty: AttributeType,
    ) -> AttributeValue {
        self.appearance.attribute_typed(&self.key(name), default, ty)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.appearance.get_bool(&self.key(name), default)
    }

    #[must_use]
    pub fn get_int(&self, name: &str, default: i32) -> i32 {
        self.appearance.get_int(&self.key(name), default)
    }

    #[must_use]
    pub fn get_double(&self, name: &str, default: f64) -> f64 {
        self.appearance.get_double(&self.key(name), default)
    }

    #[must_use]
    pub fn get_color(&self, name: &str, default: Vec4) -> Vec4 {
        self.appearance.get_color(&self.key(name), default)
    }

    #[must_use]
    pub fn get_string(&self, name: &str, default: &str) -> String {
        self.appearance.get_string(&self.key(name), default)
    }
}
