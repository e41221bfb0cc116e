use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::appearance::AttributeValue;
use crate::errors::{Result, SceneError};
use crate::geometry::attribute::{Attribute, Category};
use crate::geometry::data_list::DataList;
use crate::geometry::list_set::AttributeListSet;
use crate::scene::events::{GeometryChanges, GeometryEvent};
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode};
use crate::settings::LockPolicy;

/// Which attribute categories a geometry carries.
///
/// Each kind extends the previous one: a point set has vertices, a line
/// set adds edges, a face set adds faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Only whole-geometry attributes.
    Plain,
    PointSet,
    IndexedLineSet,
    IndexedFaceSet,
}

impl GeometryKind {
    #[must_use]
    pub fn supports(self, category: Category) -> bool {
        match category {
            Category::Vertex => self != GeometryKind::Plain,
            Category::Edge => {
                matches!(self, GeometryKind::IndexedLineSet | GeometryKind::IndexedFaceSet)
            }
            Category::Face => self == GeometryKind::IndexedFaceSet,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GeometryKind::Plain => "plain",
            GeometryKind::PointSet => "point set",
            GeometryKind::IndexedLineSet => "indexed line set",
            GeometryKind::IndexedFaceSet => "indexed face set",
        }
    }
}

#[derive(Debug, Default)]
struct GeometryState {
    lists: [AttributeListSet; 3],
    geometry_attributes: FxHashMap<String, AttributeValue>,

    // Pending changes of the current batch
    changes: GeometryChanges,
    changed_lists: [Vec<Attribute>; 3],
    changed_geometry: Vec<String>,
}

impl GeometryState {
    fn mark(&mut self, category: Category, attributes: impl IntoIterator<Item = Attribute>) {
        self.changes |= category_flag(category);
        let changed = &mut self.changed_lists[slot(category)];
        for attribute in attributes {
            if !changed.contains(&attribute) {
                changed.push(attribute);
            }
        }
    }

    fn mark_geometry(&mut self, key: &str) {
        self.changes |= GeometryChanges::GEOMETRY;
        if !self.changed_geometry.iter().any(|k| k == key) {
            self.changed_geometry.push(key.to_string());
        }
    }
}

fn slot(category: Category) -> usize {
    match category {
        Category::Vertex => 0,
        Category::Edge => 1,
        Category::Face => 2,
    }
}

fn category_flag(category: Category) -> GeometryChanges {
    match category {
        Category::Vertex => GeometryChanges::VERTEX,
        Category::Edge => GeometryChanges::EDGE,
        Category::Face => GeometryChanges::FACE,
    }
}

/// Geometry node: per-category attribute lists plus whole-object metadata.
///
/// All lists of a category have the category's entry count. Changing the
/// count discards the lists, so new data is installed either after
/// [`set_num_entries`](Self::set_num_entries) or in one step with
/// [`set_count_and_attributes`](Self::set_count_and_attributes).
///
/// Changes made during one write batch are merged into a single
/// [`GeometryEvent`].
pub struct Geometry {
    core: NodeCore,
    self_ref: Weak<Geometry>,
    kind: GeometryKind,
    state: RwLock<GeometryState>,
    listeners: Listeners<Callback<GeometryEvent>>,
}

impl Geometry {
    #[must_use]
    pub fn new(kind: GeometryKind) -> Arc<Self> {
        Self::with_policy(kind, None, LockPolicy::global())
    }

    #[must_use]
    pub fn with_name(kind: GeometryKind, name: &str) -> Arc<Self> {
        Self::with_policy(kind, Some(name), LockPolicy::global())
    }

    #[must_use]
    pub fn with_policy(kind: GeometryKind, name: Option<&str>, policy: LockPolicy) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            core: NodeCore::new(NodeKind::Geometry, name, policy),
            self_ref: self_ref.clone(),
            kind,
            state: RwLock::new(GeometryState::default()),
            listeners: Listeners::new(),
        })
    }

    #[must_use]
    pub fn point_set() -> Arc<Self> {
        Self::new(GeometryKind::PointSet)
    }

    #[must_use]
    pub fn indexed_line_set() -> Arc<Self> {
        Self::new(GeometryKind::IndexedLineSet)
    }

    #[must_use]
    pub fn indexed_face_set() -> Arc<Self> {
        Self::new(GeometryKind::IndexedFaceSet)
    }

    #[inline]
    #[must_use]
    pub fn geometry_kind(&self) -> GeometryKind {
        self.kind
    }

    fn check_category(&self, category: Category) -> Result<()> {
        if self.kind.supports(category) {
            Ok(())
        } else {
            Err(SceneError::UnsupportedCategory {
                kind: self.kind.label(),
                category: category.label(),
            })
        }
    }

    // ========================================================================
    // Per-element attributes
    // ========================================================================

    pub fn num_entries(&self, category: Category) -> Result<usize> {
        self.check_category(category)?;
        Ok(self.run_as_reader(|| self.state.read().lists[slot(category)].num_entries()))
    }

    /// Sets the entry count of `category` and discards all of its lists.
    pub fn set_num_entries(&self, category: Category, num_entries: usize) -> Result<()> {
        self.check_writable()?;
        self.check_category(category)?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let discarded = state.lists[slot(category)].attributes();
            state.lists[slot(category)].reset(num_entries);
            state.mark(category, discarded);
        })
    }

    /// Snapshot of the lists of `category`.
    pub fn attributes(&self, category: Category) -> Result<AttributeListSet> {
        self.check_category(category)?;
        Ok(self.run_as_reader(|| self.state.read().lists[slot(category)].clone()))
    }

    /// List stored under `attribute`, `None` when absent or when the
    /// category is not supported.
    #[must_use]
    pub fn attribute(&self, category: Category, attribute: &Attribute) -> Option<DataList> {
        if !self.kind.supports(category) {
            return None;
        }
        self.run_as_reader(|| self.state.read().lists[slot(category)].get(attribute).cloned())
    }

    /// Replaces one list. The entry count stays as it is.
    pub fn set_attributes(
        &self,
        category: Category,
        attribute: Attribute,
        list: DataList,
    ) -> Result<()> {
        self.check_writable()?;
        self.check_category(category)?;
        self.try_run_as_writer(|| {
            let mut state = self.state.write();
            state.lists[slot(category)].set(attribute.clone(), list)?;
            state.mark(category, [attribute]);
            Ok(())
        })
    }

    /// Replaces every list present in `set`. The entry count stays as it
    /// is; nothing changes unless all lists have the right length.
    pub fn set_attribute_set(&self, category: Category, set: &AttributeListSet) -> Result<()> {
        self.check_writable()?;
        self.check_category(category)?;
        self.try_run_as_writer(|| {
            let mut state = self.state.write();
            state.lists[slot(category)].merge_from(set)?;
            state.mark(category, set.attributes());
            Ok(())
        })
    }

    /// Sets the entry count from `set` and installs its lists, in one batch.
    pub fn set_count_and_attributes(
        &self,
        category: Category,
        set: &AttributeListSet,
    ) -> Result<()> {
        self.check_writable()?;
        self.check_category(category)?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let mut discarded = state.lists[slot(category)].attributes();
            discarded.extend(set.attributes());
            state.lists[slot(category)] = set.clone();
            state.mark(category, discarded);
        })
    }

    /// Returns `true` when a list was removed.
    pub fn remove_attribute(&self, category: Category, attribute: &Attribute) -> Result<bool> {
        self.check_writable()?;
        self.check_category(category)?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let removed = state.lists[slot(category)].remove(attribute).is_some();
            if removed {
                state.mark(category, [attribute.clone()]);
            }
            removed
        })
    }

    // -- Typed helpers --

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_entries(Category::Vertex).unwrap_or(0)
    }

    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.num_entries(Category::Edge).unwrap_or(0)
    }

    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.num_entries(Category::Face).unwrap_or(0)
    }

    #[must_use]
    pub fn vertex_coordinates(&self) -> Option<DataList> {
        self.attribute(Category::Vertex, &Attribute::Coordinates)
    }

    pub fn set_vertex_coordinates(&self, list: DataList) -> Result<()> {
        self.set_attributes(Category::Vertex, Attribute::Coordinates, list)
    }

    #[must_use]
    pub fn edge_indices(&self) -> Option<DataList> {
        self.attribute(Category::Edge, &Attribute::Indices)
    }

    #[must_use]
    pub fn face_indices(&self) -> Option<DataList> {
        self.attribute(Category::Face, &Attribute::Indices)
    }

    // ========================================================================
    // Whole-geometry attributes
    // ========================================================================

    /// Stores untyped metadata. [`AttributeValue::Inherited`] removes the key.
    pub fn set_geometry_attribute(&self, key: &str, value: impl Into<AttributeValue>) -> Result<()> {
        let value = value.into();
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            if value.is_inherited() {
                state.geometry_attributes.remove(key);
            } else {
                state.geometry_attributes.insert(key.to_string(), value);
            }
            state.mark_geometry(key);
        })
    }

    #[must_use]
    pub fn geometry_attribute(&self, key: &str) -> AttributeValue {
        self.run_as_reader(|| {
            self.state
                .read()
                .geometry_attributes
                .get(key)
                .cloned()
                .unwrap_or(AttributeValue::Inherited)
        })
    }

    /// Snapshot of the whole-geometry attributes, sorted by key.
    #[must_use]
    pub fn geometry_attributes(&self) -> Vec<(String, AttributeValue)> {
        let mut entries: Vec<(String, AttributeValue)> = self.run_as_reader(|| {
            self.state
                .read()
                .geometry_attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        });
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_geometry_listener(
        &self,
        listener: impl Fn(&GeometryEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_geometry_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl SceneGraphNode for Geometry {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn writing_finished(&self) {
        let (changes, [vertex, edge, face], geometry) = {
            let mut state = self.state.write();
            if state.changes.is_empty() {
                return;
            }
            (
                std::mem::take(&mut state.changes),
                std::mem::take(&mut state.changed_lists),
                std::mem::take(&mut state.changed_geometry),
            )
        };
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        log::debug!(
            "Geometry '{}' flushing changes {changes:?}",
            self.core.name_unlocked()
        );
        let event = GeometryEvent {
            source,
            changes,
            vertex_attributes: vertex,
            edge_attributes: edge,
            face_attributes: face,
            geometry_attributes: geometry,
        };
        self.listeners.notify(&self.core, |listener| listener(&event));
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Geometry")
            .field("core", &self.core)
            .field("kind", &self.kind)
            .field("vertices", &state.lists[0].num_entries())
            .field("edges", &state.lists[1].num_entries())
            .field("faces", &state.lists[2].num_entries())
            .finish_non_exhaustive()
    }
}
