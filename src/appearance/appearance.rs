use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::appearance::scope::AttributeScope;
use crate::appearance::value::{AttributeType, AttributeValue};
use crate::errors::{Result, SceneError};
use crate::scene::events::AppearanceEvent;
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode};
use crate::settings::LockPolicy;

#[derive(Debug, Default)]
struct AppearanceState {
    attributes: FxHashMap<String, AttributeValue>,
    /// Keys changed in the current batch, with the value each had before.
    changed: Vec<(String, AttributeValue)>,
}

/// String-keyed attribute container attached to a component.
///
/// Keys are free-form and conventionally dotted (`"polygonShader.diffuseColor"`);
/// the dots only matter to [`EffectiveAppearance`](super::EffectiveAppearance)
/// resolution. Storing [`AttributeValue::Inherited`] removes a key.
pub struct Appearance {
    core: NodeCore,
    self_ref: Weak<Appearance>,
    state: RwLock<AppearanceState>,
    listeners: Listeners<Callback<AppearanceEvent>>,
}

impl Appearance {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_policy(None, LockPolicy::global())
    }

    #[must_use]
    pub fn with_name(name: &str) -> Arc<Self> {
        Self::with_policy(Some(name), LockPolicy::global())
    }

    #[must_use]
    pub fn with_policy(name: Option<&str>, policy: LockPolicy) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            core: NodeCore::new(NodeKind::Appearance, name, policy),
            self_ref: self_ref.clone(),
            state: RwLock::new(AppearanceState::default()),
            listeners: Listeners::new(),
        })
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Stored value, or [`AttributeValue::Inherited`] when the key is absent.
    /// May return [`AttributeValue::Default`].
    #[must_use]
    pub fn attribute(&self, key: &str) -> AttributeValue {
        self.run_as_reader(|| {
            self.state
                .read()
                .attributes
                .get(key)
                .cloned()
                .unwrap_or(AttributeValue::Inherited)
        })
    }

    /// Like [`attribute`](Self::attribute), but a stored value that is not an
    /// instance of `ty` is reported as [`AttributeValue::Inherited`].
    /// [`AttributeValue::Default`] is always returned as is.
    #[must_use]
    pub fn attribute_typed(&self, key: &str, ty: AttributeType) -> AttributeValue {
        match self.attribute(key) {
            value @ AttributeValue::Default => value,
            value if value.is_instance_of(ty) => value,
            _ => AttributeValue::Inherited,
        }
    }

    /// Sorted list of keys with a stored value.
    #[must_use]
    pub fn attribute_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> =
            self.run_as_reader(|| self.state.read().attributes.keys().cloned().collect());
        keys.sort_unstable();
        keys
    }

    /// Snapshot of all stored attributes, sorted by key.
    #[must_use]
    pub fn stored_attributes(&self) -> Vec<(String, AttributeValue)> {
        let mut entries: Vec<(String, AttributeValue)> = self.run_as_reader(|| {
            self.state
                .read()
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        });
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.run_as_reader(|| self.state.read().attributes.len())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Stores `value` under `key`, declared as the value's own type.
    pub fn set_attribute(&self, key: &str, value: impl Into<AttributeValue>) -> Result<()> {
        self.set_attribute_typed(key, value, AttributeType::Any)
    }

    /// Stores `value` under `key`.
    ///
    /// The value must be an instance of `declared` unless it is a sentinel.
    /// Attribute scopes are rejected: store the underlying values instead.
    pub fn set_attribute_typed(
        &self,
        key: &str,
        value: impl Into<AttributeValue>,
        declared: AttributeType,
    ) -> Result<()> {
        let value = value.into();
        self.check_writable()?;

        if let AttributeValue::Object(object) = &value
            && (object.is::<AttributeScope>() || object.is::<Arc<AttributeScope>>())
        {
            return Err(SceneError::InvalidArgument(format!(
                "attribute '{key}': attribute scopes cannot be stored as values"
            )));
        }
        if !value.is_sentinel() && !value.is_instance_of(declared) {
            return Err(SceneError::InvalidArgument(format!(
                "attribute '{key}': {value:?} is not an instance of {declared:?}"
            )));
        }

        self.run_as_writer(|| {
            let mut state = self.state.write();
            let old = if value.is_inherited() {
                state.attributes.remove(key)
            } else {
                state.attributes.insert(key.to_string(), value.clone())
            }
            .unwrap_or(AttributeValue::Inherited);

            if !old.is_identical(&value) && !state.changed.iter().any(|(k, _)| k == key) {
                state.changed.push((key.to_string(), old));
            }
        })
    }

    /// Removes every stored attribute. One event fires per removed key.
    pub fn clear_attributes(&self) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let AppearanceState { attributes, changed } = &mut *state;
            for (key, old) in attributes.drain() {
                if !changed.iter().any(|(k, _)| *k == key) {
                    changed.push((key, old));
                }
            }
        })
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_appearance_listener(
        &self,
        listener: impl Fn(&AppearanceEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_appearance_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl SceneGraphNode for Appearance {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn writing_finished(&self) {
        let changed = std::mem::take(&mut self.state.write().changed);
        if changed.is_empty() {
            return;
        }
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        log::debug!(
            "Appearance '{}' flushing {} attribute change(s)",
            self.core.name_unlocked(),
            changed.len()
        );
        for (key, old_value) in changed {
            let event = AppearanceEvent {
                source: Arc::clone(&source),
                key,
                old_value,
            };
            self.listeners.notify(&self.core, |listener| listener(&event));
        }
    }
}

impl fmt::Debug for Appearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Appearance")
            .field("core", &self.core)
            .field("attributes", &self.state.read().attributes.len())
            .finish_non_exhaustive()
    }
}
