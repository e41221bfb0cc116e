//! Appearance inheritance along a path.
//!
//! An [`EffectiveAppearance`] is a chain of frames, one per appearance met on
//! the way from the root to a point in the tree. Frames are immutable and
//! shared: the chain for a child component is its parent's chain plus one
//! frame, so backends build the chains incrementally while traversing.
//!
//! # Resolution
//!
//! A key such as `"polygonShader.textureShader.color"` yields candidates from
//! most to least specific by cutting out the middle of the key, keeping its
//! last part:
//!
//! 1. `polygonShader.textureShader.color`
//! 2. `polygonShader.color`
//! 3. `color`
//!
//! Each candidate is looked up in every frame, nearest first, before the next
//! one is tried. A qualified key set on an ancestor therefore wins over the
//! bare last part set closer to the leaf. A
//! [`Default`](AttributeValue::Default) found anywhere stops the search and
//! yields the caller's default.

use std::fmt;
use std::sync::Arc;

use glam::Vec4;

use crate::appearance::appearance::Appearance;
use crate::appearance::scope::AttributeScope;
use crate::appearance::value::{AttributeType, AttributeValue};
use crate::scene::node::SceneGraphNode;
use crate::scene::path::SceneGraphPath;

/// One frame of the inheritance chain.
pub struct EffectiveAppearance {
    parent: Option<Arc<EffectiveAppearance>>,
    appearance: Arc<Appearance>,
}

impl EffectiveAppearance {
    /// Root frame carrying an empty appearance.
    #[must_use]
    pub fn create() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            appearance: Appearance::with_name("effective appearance root"),
        })
    }

    /// Frame for `appearance` on top of `self`.
    #[must_use]
    pub fn create_child(self: &Arc<Self>, appearance: Arc<Appearance>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(self)),
            appearance,
        })
    }

    /// Builds the chain for `path`, pushing one frame per component that
    /// carries an appearance, root first.
    #[must_use]
    pub fn create_from_path(path: &SceneGraphPath) -> Arc<Self> {
        path.iter()
            .filter_map(|node| node.as_component().and_then(|c| c.appearance()))
            .fold(Self::create(), |frame, app| frame.create_child(app))
    }

    #[must_use]
    pub fn appearance(&self) -> &Arc<Appearance> {
        &self.appearance
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<EffectiveAppearance>> {
        self.parent.as_ref()
    }

    /// Appearances of the chain, root first. Includes the root frame's
    /// empty appearance.
    #[must_use]
    pub fn appearance_hierarchy(&self) -> Vec<Arc<Appearance>> {
        let mut hierarchy: Vec<Arc<Appearance>> =
            self.frames().map(|frame| Arc::clone(&frame.appearance)).collect();
        hierarchy.reverse();
        hierarchy
    }

    fn frames(&self) -> impl Iterator<Item = &EffectiveAppearance> {
        std::iter::successors(Some(self), |frame| frame.parent.as_deref())
    }

    /// Checks that `ea` was built from exactly the appearances on `path`.
    ///
    /// Used to detect a stale cached chain before reusing it.
    #[must_use]
    pub fn matches(ea: &EffectiveAppearance, path: &SceneGraphPath) -> bool {
        let mut frame = ea;
        for node in path.iter().rev() {
            let Some(app) = node.as_component().and_then(|c| c.appearance()) else {
                continue;
            };
            if frame.appearance.id() != app.id() {
                return false;
            }
            match frame.parent.as_deref() {
                Some(parent) => frame = parent,
                None => return false,
            }
        }
        frame.parent.is_none()
    }

    /// A prefixed reader over this chain.
    #[must_use]
    pub fn scope(self: &Arc<Self>, prefix: &str) -> AttributeScope {
        AttributeScope::new(Arc::clone(self), prefix)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves `key`, returning `default` when no frame has a value.
    #[must_use]
    pub fn attribute(&self, key: &str, default: AttributeValue) -> AttributeValue {
        self.attribute_typed(key, default, AttributeType::Any)
    }

    /// Resolves `key`, ignoring stored values that are not instances of `ty`.
    #[must_use]
    pub fn attribute_typed(
        &self,
        key: &str,
        default: AttributeValue,
        ty: AttributeType,
    ) -> AttributeValue {
        match self.resolve(key, ty) {
            AttributeValue::Inherited | AttributeValue::Default => default,
            value => value,
        }
    }

    /// Raw resolution result: a real value, [`AttributeValue::Default`] or
    /// [`AttributeValue::Inherited`] when nothing matched.
    fn resolve(&self, key: &str, ty: AttributeType) -> AttributeValue {
        for candidate in candidates(key) {
            for frame in self.frames() {
                let value = frame.appearance.attribute_typed(&candidate, ty);
                if !value.is_inherited() {
                    return value;
                }
            }
        }
        AttributeValue::Inherited
    }

    // -- Typed wrappers --

    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.resolve_as(key, AttributeType::Bool, AttributeValue::as_bool)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.resolve_as(key, AttributeType::Int, AttributeValue::as_int)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        self.resolve_as(key, AttributeType::Long, AttributeValue::as_long)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.resolve_as(key, AttributeType::Float, AttributeValue::as_float)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.resolve_as(key, AttributeType::Double, AttributeValue::as_double)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_char(&self, key: &str, default: char) -> char {
        self.resolve_as(key, AttributeType::Char, AttributeValue::as_char)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.resolve_as(key, AttributeType::Str, |v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    #[must_use]
    pub fn get_color(&self, key: &str, default: Vec4) -> Vec4 {
        self.resolve_as(key, AttributeType::Color, AttributeValue::as_color)
            .unwrap_or(default)
    }

    fn resolve_as<T>(
        &self,
        key: &str,
        ty: AttributeType,
        extract: impl FnOnce(&AttributeValue) -> Option<T>,
    ) -> Option<T> {
        extract(&self.resolve(key, ty))
    }
}

/// Lookup keys for `key`, most specific first, ending with its last part.
fn candidates(key: &str) -> Vec<String> {
    let Some(last_dot) = key.rfind('.') else {
        return vec![key.to_string()];
    };
    let last_part = &key[last_dot + 1..];
    let mut keys = Vec::new();
    let mut dot = Some(last_dot);
    while let Some(d) = dot {
        keys.push(format!("{}{last_part}", &key[..=d]));
        dot = key[..d].rfind('.');
    }
    keys.push(last_part.to_string());
    keys
}

impl fmt::Debug for EffectiveAppearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .appearance_hierarchy()
            .iter()
            .map(|app| app.name())
            .collect();
        f.debug_struct("EffectiveAppearance")
            .field("frames", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(apps: &[Arc<Appearance>]) -> Arc<EffectiveAppearance> {
        apps.iter()
            .fold(EffectiveAppearance::create(), |ea, app| ea.create_child(Arc::clone(app)))
    }

    #[test]
    fn test_candidate_order() {
        assert_eq!(candidates("a.b.c"), vec!["a.b.c", "a.c", "c"]);
        assert_eq!(candidates("c"), vec!["c"]);
    }

    #[test]
    fn test_candidates_cut_middle_parts() {
        let app = Appearance::new();
        app.set_attribute("a.c", 1_i32).unwrap();
        let ea = chain(&[app]);
        assert_eq!(ea.get_int("a.b.c", 0), 1);
        assert_eq!(ea.get_int("b.c", 0), 0);
    }

    #[test]
    fn test_default_sentinel_stops_search() {
        let outer = Appearance::new();
        outer.set_attribute("lineWidth", 3.0).unwrap();
        let inner = Appearance::new();
        inner.set_attribute("lineWidth", AttributeValue::Default).unwrap();

        let ea = chain(&[outer, inner]);
        assert_eq!(ea.get_double("lineWidth", 1.0), 1.0);
    }

    #[test]
    fn test_typed_wrapper_skips_mismatched_values() {
        let outer = Appearance::new();
        outer.set_attribute("pointRadius", 0.25).unwrap();
        let inner = Appearance::new();
        inner.set_attribute("pointRadius", 7_i32).unwrap();

        let ea = chain(&[outer, inner]);
        assert_eq!(ea.get_double("pointRadius", 1.0), 0.25);
        assert_eq!(ea.get_int("pointRadius", 0), 7);
    }
}
