//! SceneGraphComponent tests
//!
//! Tests for:
//! - Loop rejection leaving the child lists unchanged
//! - Slot replacement events chosen by the old/new pattern
//! - FIFO delivery of queued structural events
//! - Tools, visibility and pickability
//! - Write-scoped traversal

use std::sync::Arc;

use arbor::appearance::Appearance;
use arbor::errors::SceneError;
use arbor::geometry::Geometry;
use arbor::scene::{
    ChildType, ComponentEvent, ComponentEventKind, ComponentListener, SceneGraphComponent,
    SceneGraphNode, SceneNode, Tool, ToolEvent, ToolListener, Transformation,
};
use parking_lot::Mutex;

// ============================================================================
// Helper
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(ComponentEventKind, Option<ChildType>, Option<usize>)>>,
}

impl Recorder {
    fn record(&self, e: &ComponentEvent) {
        self.events.lock().push((e.kind, e.child_type, e.index));
    }

    fn take(&self) -> Vec<(ComponentEventKind, Option<ChildType>, Option<usize>)> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ComponentListener for Recorder {
    fn child_added(&self, e: &ComponentEvent) {
        self.record(e);
    }
    fn child_removed(&self, e: &ComponentEvent) {
        self.record(e);
    }
    fn child_replaced(&self, e: &ComponentEvent) {
        self.record(e);
    }
    fn visibility_changed(&self, e: &ComponentEvent) {
        self.record(e);
    }
    fn pickability_changed(&self, e: &ComponentEvent) {
        self.record(e);
    }
}

fn recorded(c: &SceneGraphComponent) -> Arc<Recorder> {
    let recorder = Arc::new(Recorder::default());
    c.add_component_listener(recorder.clone());
    recorder
}

#[derive(Debug)]
struct RotateTool;

impl Tool for RotateTool {
    fn description(&self) -> &str {
        "rotate"
    }
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn cycle_is_rejected_without_mutation() {
    let a = SceneGraphComponent::with_name("a");
    let b = SceneGraphComponent::with_name("b");
    let c = SceneGraphComponent::with_name("c");
    a.add_child(&b).unwrap();
    b.add_child(&c).unwrap();
    let rec = recorded(&c);

    let err = c.add_child(&a).unwrap_err();
    assert_eq!(
        err,
        SceneError::Loop {
            parent: "c".into(),
            child: "a".into()
        }
    );
    assert_eq!(a.child_count(), 1);
    assert_eq!(b.child_count(), 1);
    assert_eq!(c.child_count(), 0);
    assert!(rec.take().is_empty());
}

#[test]
fn batch_add_is_all_or_nothing() {
    let root = SceneGraphComponent::new();
    let inner = SceneGraphComponent::new();
    root.add_child(&inner).unwrap();

    let fresh = SceneGraphComponent::new();
    let err = inner.add_children(&[fresh, Arc::clone(&root)]).unwrap_err();
    assert!(matches!(err, SceneError::Loop { .. }));
    assert_eq!(inner.child_count(), 0);
}

#[test]
fn read_only_component_rejects_mutation() {
    let c = SceneGraphComponent::new();
    c.set_read_only(true);
    assert!(matches!(
        c.add_child(&SceneGraphComponent::new()),
        Err(SceneError::ReadOnly(_))
    ));
    assert!(matches!(c.set_visible(false), Err(SceneError::ReadOnly(_))));
    assert!(c.is_visible());
}

// ============================================================================
// Slots & events
// ============================================================================

#[test]
fn slot_events_follow_old_new_pattern() {
    let c = SceneGraphComponent::new();
    let rec = recorded(&c);
    let t1 = Transformation::new();
    let t2 = Transformation::new();

    c.set_transformation(None).unwrap();
    c.set_transformation(Some(Arc::clone(&t1))).unwrap();
    c.set_transformation(Some(Arc::clone(&t1))).unwrap();
    c.set_transformation(Some(Arc::clone(&t2))).unwrap();
    c.set_transformation(None).unwrap();

    let t = Some(ChildType::Transformation);
    assert_eq!(
        rec.take(),
        vec![
            (ComponentEventKind::ChildAdded, t, None),
            (ComponentEventKind::ChildReplaced, t, None),
            (ComponentEventKind::ChildRemoved, t, None),
        ]
    );
}

#[test]
fn replaced_event_carries_both_children() {
    let c = SceneGraphComponent::new();
    let a1 = Appearance::new();
    let a2 = Appearance::new();
    c.set_appearance(Some(Arc::clone(&a1))).unwrap();

    let seen = Arc::new(Mutex::new(None));
    struct Capture(Arc<Mutex<Option<(SceneNode, SceneNode)>>>);
    impl ComponentListener for Capture {
        fn child_replaced(&self, e: &ComponentEvent) {
            *self.0.lock() = Some((e.old_child.clone().unwrap(), e.new_child.clone().unwrap()));
        }
    }
    c.add_component_listener(Arc::new(Capture(Arc::clone(&seen))));

    c.set_appearance(Some(Arc::clone(&a2))).unwrap();
    let (old, new) = seen.lock().take().unwrap();
    assert_eq!(old, SceneNode::from(&a1));
    assert_eq!(new, SceneNode::from(&a2));
}

#[test]
fn events_are_delivered_fifo_after_batch() {
    let c = SceneGraphComponent::new();
    let rec = recorded(&c);
    let x = SceneGraphComponent::new();
    let y = SceneGraphComponent::new();

    c.run_as_writer(|| {
        c.add_child(&x).unwrap();
        c.set_geometry(Some(Geometry::point_set())).unwrap();
        c.add_child(&y).unwrap();
        c.set_visible(false).unwrap();
        c.remove_child(&x).unwrap();
        c.set_pickable(false).unwrap();
        assert!(rec.take().is_empty());
    })
    .unwrap();

    let comp = Some(ChildType::Component);
    assert_eq!(
        rec.take(),
        vec![
            (ComponentEventKind::ChildAdded, comp, Some(0)),
            (ComponentEventKind::ChildAdded, Some(ChildType::Geometry), None),
            (ComponentEventKind::ChildAdded, comp, Some(1)),
            (ComponentEventKind::VisibilityChanged, None, None),
            (ComponentEventKind::ChildRemoved, comp, Some(0)),
            (ComponentEventKind::PickabilityChanged, None, None),
        ]
    );
    assert_eq!(c.index_of_child(&y), Some(0));
}

#[test]
fn remove_all_children_reports_each() {
    let c = SceneGraphComponent::new();
    c.add_children(&[
        SceneGraphComponent::new(),
        SceneGraphComponent::new(),
        SceneGraphComponent::new(),
    ])
    .unwrap();
    let rec = recorded(&c);

    c.remove_all_children().unwrap();
    assert_eq!(c.child_count(), 0);
    let indices: Vec<Option<usize>> = rec.take().into_iter().map(|(_, _, i)| i).collect();
    assert_eq!(indices, vec![Some(2), Some(1), Some(0)]);
}

// ============================================================================
// Tools
// ============================================================================

#[test]
fn tool_list_and_events() {
    #[derive(Default)]
    struct ToolLog(Mutex<Vec<(String, bool)>>);
    impl ToolListener for ToolLog {
        fn tool_added(&self, e: &ToolEvent) {
            self.0.lock().push((e.tool.description().to_string(), e.added));
        }
        fn tool_removed(&self, e: &ToolEvent) {
            self.0.lock().push((e.tool.description().to_string(), e.added));
        }
    }

    let c = SceneGraphComponent::new();
    let log = Arc::new(ToolLog::default());
    c.add_tool_listener(log.clone());
    let tool: Arc<dyn Tool> = Arc::new(RotateTool);

    c.add_tool(Arc::clone(&tool)).unwrap();
    c.add_tool(Arc::clone(&tool)).unwrap();
    assert_eq!(c.tools().len(), 1);
    assert!(c.remove_tool(&tool).unwrap());
    assert!(!c.remove_tool(&tool).unwrap());

    assert_eq!(
        *log.0.lock(),
        vec![("rotate".to_string(), true), ("rotate".to_string(), false)]
    );
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn write_accept_locks_each_visited_node() {
    let c = SceneGraphComponent::new();
    let t = Transformation::new();
    let child = SceneGraphComponent::new();
    c.set_transformation(Some(Arc::clone(&t))).unwrap();
    c.add_child(&child).unwrap();

    let mut locked = Vec::new();
    c.children_write_accept(&mut |node: &SceneNode| {
        locked.push(node.as_node().core().lock().is_write_locked_by_current_thread());
    })
    .unwrap();

    assert_eq!(locked, vec![true, true]);
    assert!(!t.core().lock().is_write_locked());
    assert!(!child.core().lock().is_write_locked());
}
