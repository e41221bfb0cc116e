use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::appearance::Appearance;
use crate::errors::{Result, SceneError};
use crate::geometry::Geometry;
use crate::scene::audio::AudioSource;
use crate::scene::camera::Camera;
use crate::scene::events::{
    ChildType, ComponentEvent, ComponentEventKind, ComponentListener, ToolEvent, ToolListener,
};
use crate::scene::light::Light;
use crate::scene::listeners::{ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode, SceneNode};
use crate::scene::tool::Tool;
use crate::scene::transformation::Transformation;
use crate::scene::traversal::SceneGraphVisitor;
use crate::settings::LockPolicy;

/// A change queued during a write batch, turned into an event when the
/// batch ends.
#[derive(Debug)]
enum Pending {
    Structure {
        kind: ComponentEventKind,
        child_type: Option<ChildType>,
        old_child: Option<SceneNode>,
        new_child: Option<SceneNode>,
        index: Option<usize>,
    },
    Tool {
        tool: Arc<dyn Tool>,
        added: bool,
    },
}

#[derive(Debug)]
struct ComponentState {
    transformation: Option<Arc<Transformation>>,
    appearance: Option<Arc<Appearance>>,
    camera: Option<Arc<Camera>>,
    light: Option<Arc<Light>>,
    geometry: Option<Arc<Geometry>>,
    audio_source: Option<Arc<AudioSource>>,
    children: Vec<Arc<SceneGraphComponent>>,
    tools: Vec<Arc<dyn Tool>>,
    visible: bool,
    pickable: bool,
    pending: Vec<Pending>,
}

impl Default for ComponentState {
    fn default() -> Self {
        Self {
            transformation: None,
            appearance: None,
            camera: None,
            light: None,
            geometry: None,
            audio_source: None,
            children: Vec::new(),
            tools: Vec::new(),
            visible: true,
            pickable: true,
            pending: Vec::new(),
        }
    }
}

impl ComponentState {
    fn push_structure(
        &mut self,
        kind: ComponentEventKind,
        child_type: ChildType,
        old_child: Option<SceneNode>,
        new_child: Option<SceneNode>,
        index: Option<usize>,
    ) {
        self.pending.push(Pending::Structure {
            kind,
            child_type: Some(child_type),
            old_child,
            new_child,
            index,
        });
    }

    /// Slots then children, in traversal order.
    fn visit_order(&self) -> Vec<SceneNode> {
        let slots = [
            self.transformation.as_ref().map(SceneNode::from),
            self.appearance.as_ref().map(SceneNode::from),
            self.camera.as_ref().map(SceneNode::from),
            self.light.as_ref().map(SceneNode::from),
            self.geometry.as_ref().map(SceneNode::from),
            self.audio_source.as_ref().map(SceneNode::from),
        ];
        slots
            .into_iter()
            .flatten()
            .chain(self.children.iter().map(SceneNode::from))
            .collect()
    }
}

/// Composite node of the tree.
///
/// A component holds at most one node of each leaf kind in its slots, an
/// ordered list of child components and an ordered list of tools. The child
/// graph is kept acyclic: [`add_child`](Self::add_child) rejects any child
/// from which this component can be reached. A component may still appear
/// below several parents.
///
/// Structural changes are queued during a write batch and delivered, in the
/// order they were made, when the outermost batch ends.
pub struct SceneGraphComponent {
    core: NodeCore,
    self_ref: Weak<SceneGraphComponent>,
    state: RwLock<ComponentState>,
    component_listeners: Listeners<dyn ComponentListener>,
    tool_listeners: Listeners<dyn ToolListener>,
}

impl SceneGraphComponent {
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
            core: NodeCore::new(NodeKind::Component, name, policy),
            self_ref: self_ref.clone(),
            state: RwLock::new(ComponentState::default()),
            component_listeners: Listeners::new(),
            tool_listeners: Listeners::new(),
        })
    }

    fn read<R>(&self, f: impl FnOnce(&ComponentState) -> R) -> R {
        self.run_as_reader(|| f(&self.state.read()))
    }

    // ========================================================================
    // Children
    // ========================================================================

    /// Appends `child`.
    ///
    /// Fails with [`SceneError::Loop`] when `child` is this component or
    /// when this component is reachable from `child`; the child list is
    /// then left unchanged.
    pub fn add_child(&self, child: &Arc<SceneGraphComponent>) -> Result<()> {
        self.add_children(std::slice::from_ref(child))
    }

    /// Appends every component of `children`, in order. Either all of them
    /// are added or, on a loop, none.
    pub fn add_children(&self, children: &[Arc<SceneGraphComponent>]) -> Result<()> {
        self.check_writable()?;
        if let Some(child) = children.iter().find(|c| c.id() == self.id()) {
            return Err(self.loop_error(child));
        }
        self.try_run_as_writer(|| {
            if let Some(child) = children.iter().find(|c| c.reaches(self.id())) {
                return Err(self.loop_error(child));
            }
            let mut state = self.state.write();
            for child in children {
                let index = state.children.len();
                state.children.push(Arc::clone(child));
                state.push_structure(
                    ComponentEventKind::ChildAdded,
                    ChildType::Component,
                    None,
                    Some(SceneNode::from(child)),
                    Some(index),
                );
            }
            Ok(())
        })
    }

    fn loop_error(&self, child: &SceneGraphComponent) -> SceneError {
        let err = SceneError::Loop {
            parent: self.core.name_unlocked(),
            child: child.core.name_unlocked(),
        };
        log::warn!("{err}");
        err
    }

    /// Whether the component with id `target` is this component or lies
    /// below it.
    fn reaches(&self, target: u64) -> bool {
        let Some(start) = self.self_ref.upgrade() else {
            return false;
        };
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(component) = stack.pop() {
            if component.id() == target {
                return true;
            }
            if visited.insert(component.id()) {
                stack.extend(component.children());
            }
        }
        false
    }

    /// Removes the first occurrence of `child`. Returns `false` when it was
    /// not a child.
    pub fn remove_child(&self, child: &Arc<SceneGraphComponent>) -> Result<bool> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let Some(index) = state.children.iter().position(|c| Arc::ptr_eq(c, child)) else {
                return false;
            };
            let removed = state.children.remove(index);
            state.push_structure(
                ComponentEventKind::ChildRemoved,
                ChildType::Component,
                Some(SceneNode::from(removed)),
                None,
                Some(index),
            );
            true
        })
    }

    /// Removes every child, last first. One event per removed child.
    pub fn remove_all_children(&self) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            while let Some(removed) = state.children.pop() {
                let index = state.children.len();
                state.push_structure(
                    ComponentEventKind::ChildRemoved,
                    ChildType::Component,
                    Some(SceneNode::from(removed)),
                    None,
                    Some(index),
                );
            }
        })
    }

    pub fn child(&self, index: usize) -> Result<Arc<SceneGraphComponent>> {
        self.read(|s| {
            s.children
                .get(index)
                .cloned()
                .ok_or(SceneError::IndexOutOfRange {
                    index,
                    len: s.children.len(),
                })
        })
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.read(|s| s.children.len())
    }

    /// Snapshot of the child list.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<SceneGraphComponent>> {
        self.read(|s| s.children.clone())
    }

    #[must_use]
    pub fn index_of_child(&self, child: &Arc<SceneGraphComponent>) -> Option<usize> {
        self.read(|s| s.children.iter().position(|c| Arc::ptr_eq(c, child)))
    }

    /// Whether `node` sits in one of this component's slots or is one of
    /// its children.
    #[must_use]
    pub fn is_direct_ancestor(&self, node: &SceneNode) -> bool {
        self.read(|s| s.visit_order().contains(node))
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// Replaces a slot and queues one event chosen by which of old and new
    /// are present. Re-installing the same node is not a change.
    fn replace_slot<T>(
        &self,
        child_type: ChildType,
        new: Option<Arc<T>>,
        slot: impl FnOnce(&mut ComponentState) -> &mut Option<Arc<T>>,
    ) -> Result<()>
    where
        SceneNode: From<Arc<T>>,
    {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let old = std::mem::replace(slot(&mut *state), new.clone());
            let kind = match (&old, &new) {
                (None, None) => return,
                (Some(a), Some(b)) if Arc::ptr_eq(a, b) => return,
                (None, Some(_)) => ComponentEventKind::ChildAdded,
                (Some(_), None) => ComponentEventKind::ChildRemoved,
                (Some(_), Some(_)) => ComponentEventKind::ChildReplaced,
            };
            state.push_structure(
                kind,
                child_type,
                old.map(SceneNode::from),
                new.map(SceneNode::from),
                None,
            );
        })
    }

    pub fn set_transformation(&self, t: Option<Arc<Transformation>>) -> Result<()> {
        self.replace_slot(ChildType::Transformation, t, |s| &mut s.transformation)
    }

    pub fn set_appearance(&self, a: Option<Arc<Appearance>>) -> Result<()> {
        self.replace_slot(ChildType::Appearance, a, |s| &mut s.appearance)
    }

    pub fn set_camera(&self, c: Option<Arc<Camera>>) -> Result<()> {
        self.replace_slot(ChildType::Camera, c, |s| &mut s.camera)
    }

    pub fn set_light(&self, l: Option<Arc<Light>>) -> Result<()> {
        self.replace_slot(ChildType::Light, l, |s| &mut s.light)
    }

    pub fn set_geometry(&self, g: Option<Arc<Geometry>>) -> Result<()> {
        self.replace_slot(ChildType::Geometry, g, |s| &mut s.geometry)
    }

    pub fn set_audio_source(&self, a: Option<Arc<AudioSource>>) -> Result<()> {
        self.replace_slot(ChildType::AudioSource, a, |s| &mut s.audio_source)
    }

    #[must_use]
    pub fn transformation(&self) -> Option<Arc<Transformation>> {
        self.read(|s| s.transformation.clone())
    }

    #[must_use]
    pub fn appearance(&self) -> Option<Arc<Appearance>> {
        self.read(|s| s.appearance.clone())
    }

    #[must_use]
    pub fn camera(&self) -> Option<Arc<Camera>> {
        self.read(|s| s.camera.clone())
    }

    #[must_use]
    pub fn light(&self) -> Option<Arc<Light>> {
        self.read(|s| s.light.clone())
    }

    #[must_use]
    pub fn geometry(&self) -> Option<Arc<Geometry>> {
        self.read(|s| s.geometry.clone())
    }

    #[must_use]
    pub fn audio_source(&self) -> Option<Arc<AudioSource>> {
        self.read(|s| s.audio_source.clone())
    }

    // ========================================================================
    // Tools & flags
    // ========================================================================

    /// Appends `tool` unless it is already attached.
    pub fn add_tool(&self, tool: Arc<dyn Tool>) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            if state.tools.iter().any(|t| same_tool(t, &tool)) {
                return;
            }
            state.tools.push(Arc::clone(&tool));
            state.pending.push(Pending::Tool { tool, added: true });
        })
    }

    pub fn remove_tool(&self, tool: &Arc<dyn Tool>) -> Result<bool> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let Some(index) = state.tools.iter().position(|t| same_tool(t, tool)) else {
                return false;
            };
            let removed = state.tools.remove(index);
            state.pending.push(Pending::Tool {
                tool: removed,
                added: false,
            });
            true
        })
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.read(|s| s.tools.clone())
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.read(|s| s.visible)
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.set_flag(visible, ComponentEventKind::VisibilityChanged, |s| &mut s.visible)
    }

    #[must_use]
    pub fn is_pickable(&self) -> bool {
        self.read(|s| s.pickable)
    }

    pub fn set_pickable(&self, pickable: bool) -> Result<()> {
        self.set_flag(pickable, ComponentEventKind::PickabilityChanged, |s| &mut s.pickable)
    }

    fn set_flag(
        &self,
        value: bool,
        kind: ComponentEventKind,
        flag: impl FnOnce(&mut ComponentState) -> &mut bool,
    ) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            let slot = flag(&mut *state);
            if *slot == value {
                return;
            }
            *slot = value;
            state.pending.push(Pending::Structure {
                kind,
                child_type: None,
                old_child: None,
                new_child: None,
                index: None,
            });
        })
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Visits the transformation, appearance, camera, light, geometry and
    /// audio source, then every child in order, while holding the read
    /// role of this component.
    pub fn children_accept(&self, visitor: &mut dyn SceneGraphVisitor) {
        self.run_as_reader(|| {
            let nodes = self.state.read().visit_order();
            for node in &nodes {
                visitor.visit(node);
            }
        });
    }

    /// Like [`children_accept`](Self::children_accept), but each visited
    /// node is inside its own write batch for the duration of its visit.
    pub fn children_write_accept(&self, visitor: &mut dyn SceneGraphVisitor) -> Result<()> {
        self.run_as_reader(|| {
            let nodes = self.state.read().visit_order();
            for node in &nodes {
                let batch = node.begin_write()?;
                visitor.visit(node);
                drop(batch);
            }
            Ok(())
        })
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_component_listener(&self, listener: Arc<dyn ComponentListener>) -> ListenerId {
        self.component_listeners.add(listener)
    }

    pub fn remove_component_listener(&self, id: ListenerId) -> bool {
        self.component_listeners.remove(id)
    }

    pub fn add_tool_listener(&self, listener: Arc<dyn ToolListener>) -> ListenerId {
        self.tool_listeners.add(listener)
    }

    pub fn remove_tool_listener(&self, id: ListenerId) -> bool {
        self.tool_listeners.remove(id)
    }
}

fn same_tool(a: &Arc<dyn Tool>, b: &Arc<dyn Tool>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl SceneGraphNode for SceneGraphComponent {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn writing_finished(&self) {
        let pending = std::mem::take(&mut self.state.write().pending);
        if pending.is_empty() {
            return;
        }
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        log::debug!(
            "Component '{}' flushing {} queued event(s)",
            self.core.name_unlocked(),
            pending.len()
        );

        for change in pending {
            match change {
                Pending::Structure {
                    kind,
                    child_type,
                    old_child,
                    new_child,
                    index,
                } => {
                    let event = ComponentEvent {
                        source: Arc::clone(&source),
                        kind,
                        child_type,
                        old_child,
                        new_child,
                        index,
                    };
                    self.component_listeners
                        .notify(&self.core, |listener| match kind {
                            ComponentEventKind::ChildAdded => listener.child_added(&event),
                            ComponentEventKind::ChildRemoved => listener.child_removed(&event),
                            ComponentEventKind::ChildReplaced => listener.child_replaced(&event),
                            ComponentEventKind::VisibilityChanged => {
                                listener.visibility_changed(&event);
                            }
                            ComponentEventKind::PickabilityChanged => {
                                listener.pickability_changed(&event);
                            }
                        });
                }
                Pending::Tool { tool, added } => {
                    let event = ToolEvent {
                        source: Arc::clone(&source),
                        tool,
                        added,
                    };
                    self.tool_listeners.notify(&self.core, |listener| {
                        if added {
                            listener.tool_added(&event);
                        } else {
                            listener.tool_removed(&event);
                        }
                    });
                }
            }
        }
    }
}

impl fmt::Debug for SceneGraphComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SceneGraphComponent")
            .field("core", &self.core)
            .field("children", &state.children.len())
            .field("tools", &state.tools.len())
            .field("visible", &state.visible)
            .field("pickable", &state.pickable)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_is_a_loop() {
        let c = SceneGraphComponent::with_name("c");
        let err = c.add_child(&c).unwrap_err();
        assert!(matches!(err, SceneError::Loop { .. }));
        assert_eq!(c.child_count(), 0);
    }

    #[test]
    fn test_shared_subtree_is_not_a_loop() {
        let root = SceneGraphComponent::new();
        let a = SceneGraphComponent::new();
        let b = SceneGraphComponent::new();
        let shared = SceneGraphComponent::new();
        root.add_children(&[Arc::clone(&a), Arc::clone(&b)]).unwrap();
        a.add_child(&shared).unwrap();
        b.add_child(&shared).unwrap();
        assert_eq!(root.child_count(), 2);
    }

    #[test]
    fn test_visit_order() {
        let c = SceneGraphComponent::new();
        let child = SceneGraphComponent::new();
        let geom = Geometry::point_set();
        let t = Transformation::new();
        c.add_child(&child).unwrap();
        c.set_geometry(Some(Arc::clone(&geom))).unwrap();
        c.set_transformation(Some(Arc::clone(&t))).unwrap();

        let mut kinds = Vec::new();
        c.children_accept(&mut |node: &SceneNode| kinds.push(node.kind()));
        assert_eq!(
            kinds,
            vec![NodeKind::Transformation, NodeKind::Geometry, NodeKind::Component]
        );
        assert!(c.is_direct_ancestor(&SceneNode::from(&geom)));
        assert!(!child.is_direct_ancestor(&SceneNode::from(&geom)));
    }

    #[test]
    fn test_child_index_out_of_range() {
        let c = SceneGraphComponent::new();
        assert_eq!(
            c.child(0).unwrap_err(),
            SceneError::IndexOutOfRange { index: 0, len: 0 }
        );
    }
}
