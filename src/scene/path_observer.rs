//! Change tracking for one path.
//!
//! A [`PathObserver`] listens to every component, transformation and
//! appearance along a path and reports the changes that affect what is
//! seen at the end of it: the composed matrix, inherited appearance
//! attributes, and the path itself becoming invalid. It also caches the
//! composed matrix and the effective appearance between changes.

use std::fmt;
use std::sync::{Arc, Weak};

use glam::DMat4;
use parking_lot::Mutex;

use crate::appearance::{Appearance, EffectiveAppearance};
use crate::errors::Result;
use crate::scene::component::SceneGraphComponent;
use crate::scene::events::{ChildType, ComponentEvent, ComponentListener};
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::path::SceneGraphPath;
use crate::scene::transformation::Transformation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEvent {
    /// A transformation on the path changed or was replaced.
    MatrixChanged,
    /// An attribute of an appearance on the path changed (`Some(key)`), or
    /// an appearance slot was replaced (`None`).
    AppearanceChanged { key: Option<String> },
    /// The path no longer matches the tree.
    Invalidated,
}

enum Registration {
    Component(Weak<SceneGraphComponent>, ListenerId),
    Transformation(Weak<Transformation>, ListenerId),
    Appearance(Weak<Appearance>, ListenerId),
}

impl Registration {
    fn is_leaf(&self) -> bool {
        !matches!(self, Registration::Component(..))
    }

    fn remove(&self) {
        match self {
            Registration::Component(node, id) => {
                if let Some(node) = node.upgrade() {
                    node.remove_component_listener(*id);
                }
            }
            Registration::Transformation(node, id) => {
                if let Some(node) = node.upgrade() {
                    node.remove_transformation_listener(*id);
                }
            }
            Registration::Appearance(node, id) => {
                if let Some(node) = node.upgrade() {
                    node.remove_appearance_listener(*id);
                }
            }
        }
    }
}

#[derive(Default)]
struct Cache {
    matrix: Option<DMat4>,
    appearance: Option<Arc<EffectiveAppearance>>,
    /// Bumped on every invalidation; a value computed under an older
    /// generation is not stored.
    generation: u64,
    valid: bool,
}

struct ObserverInner {
    path: SceneGraphPath,
    cache: Mutex<Cache>,
    registrations: Mutex<Vec<Registration>>,
    listeners: Listeners<Callback<PathEvent>>,
}

impl ObserverInner {
    fn label(&self) -> String {
        format!("path observer [{}]", self.path)
    }

    fn emit(&self, event: &PathEvent) {
        log::debug!("{}: {event:?}", self.label());
        self.listeners
            .notify_as(|| self.label(), |listener| listener(event));
    }

    fn invalidate(&self, matrix: bool, appearance: bool) {
        let mut cache = self.cache.lock();
        cache.generation += 1;
        if matrix {
            cache.matrix = None;
        }
        if appearance {
            cache.appearance = None;
        }
    }

    /// Registers on the transformations and appearances currently in the
    /// slots of the path's components, dropping earlier leaf registrations.
    fn attach_leaves(self: &Arc<Self>) {
        let mut registrations = self.registrations.lock();
        registrations.retain(|r| {
            if r.is_leaf() {
                r.remove();
            }
            !r.is_leaf()
        });

        for component in self.path.iter().filter_map(|n| n.as_component()) {
            if let Some(t) = component.transformation() {
                let weak = Arc::downgrade(self);
                let id = t.add_transformation_listener(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.invalidate(true, false);
                        inner.emit(&PathEvent::MatrixChanged);
                    }
                });
                registrations.push(Registration::Transformation(Arc::downgrade(&t), id));
            }
            if let Some(app) = component.appearance() {
                let weak = Arc::downgrade(self);
                let id = app.add_appearance_listener(move |event| {
                    if let Some(inner) = weak.upgrade() {
                        inner.emit(&PathEvent::AppearanceChanged {
                            key: Some(event.key.clone()),
                        });
                    }
                });
                registrations.push(Registration::Appearance(Arc::downgrade(&app), id));
            }
        }
    }

    fn on_component_event(self: &Arc<Self>, event: &ComponentEvent) {
        match event.child_type {
            Some(ChildType::Transformation) => {
                self.attach_leaves();
                self.invalidate(true, false);
                self.emit(&PathEvent::MatrixChanged);
            }
            Some(ChildType::Appearance) => {
                self.attach_leaves();
                self.invalidate(false, true);
                self.emit(&PathEvent::AppearanceChanged { key: None });
            }
            _ => {}
        }

        let valid = self.path.is_valid();
        let was_valid = std::mem::replace(&mut self.cache.lock().valid, valid);
        if was_valid && !valid {
            self.emit(&PathEvent::Invalidated);
        }
    }

    fn dispose(&self) {
        for registration in self.registrations.lock().drain(..) {
            registration.remove();
        }
    }
}

/// Forwards component events of one path component to the observer.
struct PathComponentListener {
    observer: Weak<ObserverInner>,
}

impl PathComponentListener {
    fn forward(&self, event: &ComponentEvent) {
        if let Some(inner) = self.observer.upgrade() {
            inner.on_component_event(event);
        }
    }
}

impl ComponentListener for PathComponentListener {
    fn child_added(&self, event: &ComponentEvent) {
        self.forward(event);
    }

    fn child_removed(&self, event: &ComponentEvent) {
        self.forward(event);
    }

    fn child_replaced(&self, event: &ComponentEvent) {
        self.forward(event);
    }
}

/// Observes one [`SceneGraphPath`]. Listeners are unregistered from the
/// tree when the observer is disposed or dropped.
pub struct PathObserver {
    inner: Arc<ObserverInner>,
}

impl PathObserver {
    #[must_use]
    pub fn new(path: SceneGraphPath) -> Self {
        let valid = path.is_valid();
        let inner = Arc::new(ObserverInner {
            path,
            cache: Mutex::new(Cache {
                valid,
                ..Cache::default()
            }),
            registrations: Mutex::new(Vec::new()),
            listeners: Listeners::new(),
        });

        {
            let mut registrations = inner.registrations.lock();
            for component in inner.path.iter().filter_map(|n| n.as_component()) {
                let listener = Arc::new(PathComponentListener {
                    observer: Arc::downgrade(&inner),
                });
                let id = component.add_component_listener(listener);
                registrations.push(Registration::Component(Arc::downgrade(component), id));
            }
        }
        inner.attach_leaves();

        Self { inner }
    }

    #[must_use]
    pub fn path(&self) -> &SceneGraphPath {
        &self.inner.path
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.cache.lock().valid
    }

    /// Composed matrix of the path, cached until a transformation changes.
    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        let generation = {
            let cache = self.inner.cache.lock();
            if let Some(matrix) = cache.matrix {
                return matrix;
            }
            cache.generation
        };
        let matrix = self.inner.path.matrix();
        let mut cache = self.inner.cache.lock();
        if cache.generation == generation {
            cache.matrix = Some(matrix);
        }
        matrix
    }

    pub fn inverse_matrix(&self) -> Result<DMat4> {
        crate::scene::transformation::invert(self.matrix())
    }

    /// Effective appearance at the end of the path. A cached chain is
    /// reused only while it still matches the appearances on the path.
    #[must_use]
    pub fn effective_appearance(&self) -> Arc<EffectiveAppearance> {
        let (cached, generation) = {
            let cache = self.inner.cache.lock();
            (cache.appearance.clone(), cache.generation)
        };
        if let Some(ea) = cached
            && EffectiveAppearance::matches(&ea, &self.inner.path)
        {
            return ea;
        }
        let ea = EffectiveAppearance::create_from_path(&self.inner.path);
        let mut cache = self.inner.cache.lock();
        if cache.generation == generation {
            cache.appearance = Some(Arc::clone(&ea));
        }
        ea
    }

    pub fn on_change(
        &self,
        listener: impl Fn(&PathEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.listeners.add(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Unregisters from every node of the path. The observer stops
    /// reporting changes; cached values stay readable.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for PathObserver {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for PathObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathObserver")
            .field("path", &self.inner.path.to_string())
            .field("listeners", &self.inner.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    #[test]
    fn test_matrix_cache_follows_transformation() {
        let root = SceneGraphComponent::new();
        let t = Transformation::from_translation(DVec3::X);
        root.set_transformation(Some(Arc::clone(&t))).unwrap();

        let observer = PathObserver::new(SceneGraphPath::new().push_new(&root));
        assert_eq!(observer.matrix().w_axis.x, 1.0);

        t.set_translation(DVec3::new(5.0, 0.0, 0.0)).unwrap();
        assert_eq!(observer.matrix().w_axis.x, 5.0);
    }

    #[test]
    fn test_dispose_unregisters() {
        let root = SceneGraphComponent::new();
        let t = Transformation::new();
        root.set_transformation(Some(Arc::clone(&t))).unwrap();

        let observer = PathObserver::new(SceneGraphPath::new().push_new(&root));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        observer.on_change(move |e| sink.lock().push(e.clone()));

        t.set_matrix(DMat4::IDENTITY).unwrap();
        observer.dispose();
        t.set_matrix(DMat4::IDENTITY).unwrap();

        assert_eq!(*events.lock(), vec![PathEvent::MatrixChanged]);
    }
}
