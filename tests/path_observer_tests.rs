//! PathObserver tests
//!
//! Tests for:
//! - Matrix events from transformation edits and slot replacement
//! - Appearance events carrying the changed key
//! - Invalidation when the path is cut
//! - Cached values following the tree

use std::sync::Arc;

use arbor::appearance::Appearance;
use arbor::scene::{PathEvent, PathObserver, SceneGraphComponent, SceneGraphPath, Transformation};
use glam::{DMat4, DVec3, Vec4};
use parking_lot::Mutex;

// ============================================================================
// Helper
// ============================================================================

struct Fixture {
    root: Arc<SceneGraphComponent>,
    child: Arc<SceneGraphComponent>,
    offset: Arc<Transformation>,
    look: Arc<Appearance>,
}

impl Fixture {
    fn new() -> Self {
        let root = SceneGraphComponent::with_name("root");
        let child = SceneGraphComponent::with_name("child");
        root.add_child(&child).unwrap();

        let offset = Transformation::from_translation(DVec3::new(1.0, 0.0, 0.0));
        child.set_transformation(Some(Arc::clone(&offset))).unwrap();
        let look = Appearance::with_name("look");
        root.set_appearance(Some(Arc::clone(&look))).unwrap();

        Self {
            root,
            child,
            offset,
            look,
        }
    }

    fn observe(&self) -> (PathObserver, Arc<Mutex<Vec<PathEvent>>>) {
        let observer = PathObserver::new(
            SceneGraphPath::new()
                .push_new(&self.root)
                .push_new(&self.child),
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        observer.on_change(move |e| sink.lock().push(e.clone()));
        (observer, events)
    }
}

// ============================================================================
// Matrix
// ============================================================================

#[test]
fn transformation_edit_reports_matrix_change() {
    let fx = Fixture::new();
    let (observer, events) = fx.observe();
    assert_eq!(observer.matrix().w_axis.x, 1.0);

    fx.offset.set_translation(DVec3::new(3.0, 0.0, 0.0)).unwrap();

    assert_eq!(*events.lock(), vec![PathEvent::MatrixChanged]);
    assert_eq!(observer.matrix().w_axis.x, 3.0);
}

#[test]
fn slot_replacement_reports_matrix_change_and_follows_new_transformation() {
    let fx = Fixture::new();
    let (observer, events) = fx.observe();
    let _ = observer.matrix();

    let replacement = Transformation::from_translation(DVec3::new(0.0, 2.0, 0.0));
    fx.root
        .set_transformation(Some(Arc::clone(&replacement)))
        .unwrap();
    assert_eq!(*events.lock(), vec![PathEvent::MatrixChanged]);
    assert!(
        observer
            .matrix()
            .abs_diff_eq(DMat4::from_translation(DVec3::new(1.0, 2.0, 0.0)), 1e-12)
    );

    // Edits on the new transformation are observed as well
    replacement.set_translation(DVec3::ZERO).unwrap();
    assert_eq!(events.lock().len(), 2);
    assert_eq!(observer.matrix().w_axis.y, 0.0);

    let inverse = observer.inverse_matrix().unwrap();
    assert!((inverse * observer.matrix()).abs_diff_eq(DMat4::IDENTITY, 1e-12));
}

// ============================================================================
// Appearance
// ============================================================================

#[test]
fn appearance_edit_reports_key() {
    let fx = Fixture::new();
    let (_observer, events) = fx.observe();

    fx.look.set_attribute("lineWidth", 2.0).unwrap();

    assert_eq!(
        *events.lock(),
        vec![PathEvent::AppearanceChanged {
            key: Some("lineWidth".into())
        }]
    );
}

#[test]
fn cached_appearance_is_rebuilt_after_slot_change() {
    let fx = Fixture::new();
    fx.look
        .set_attribute("diffuseColor", Vec4::new(1.0, 0.0, 0.0, 1.0))
        .unwrap();
    let (observer, events) = fx.observe();

    let first = observer.effective_appearance();
    assert!(Arc::ptr_eq(&first, &observer.effective_appearance()));

    let inner = Appearance::with_name("inner");
    inner
        .set_attribute("diffuseColor", Vec4::new(0.0, 1.0, 0.0, 1.0))
        .unwrap();
    fx.child.set_appearance(Some(inner)).unwrap();

    assert_eq!(
        *events.lock(),
        vec![PathEvent::AppearanceChanged { key: None }]
    );
    let second = observer.effective_appearance();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(
        second.get_color("diffuseColor", Vec4::ZERO),
        Vec4::new(0.0, 1.0, 0.0, 1.0)
    );
}

// ============================================================================
// Validity & lifetime
// ============================================================================

#[test]
fn cutting_the_path_invalidates_observer() {
    let fx = Fixture::new();
    let (observer, events) = fx.observe();
    assert!(observer.is_valid());

    fx.root.remove_child(&fx.child).unwrap();

    assert!(!observer.is_valid());
    assert_eq!(*events.lock(), vec![PathEvent::Invalidated]);
}

#[test]
fn dropped_observer_leaves_no_listeners() {
    let fx = Fixture::new();
    let (observer, events) = fx.observe();
    drop(observer);

    fx.offset.set_translation(DVec3::ONE).unwrap();
    fx.look.set_attribute("lineWidth", 2.0).unwrap();
    fx.root.remove_child(&fx.child).unwrap();
    assert!(events.lock().is_empty());
}
