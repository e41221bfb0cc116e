//! Geometry tests
//!
//! Tests for:
//! - Entry count reset discarding the category's lists
//! - Length checks on single lists and whole sets
//! - Zero-width tuple lists
//! - set_count_and_attributes in one batch
//! - Merged change events per batch

use std::sync::Arc;

use arbor::errors::SceneError;
use arbor::geometry::{Attribute, AttributeListSet, Category, DataList, Geometry, GeometryKind};
use arbor::scene::{GeometryChanges, GeometryEvent, SceneGraphNode};
use glam::DVec3;
use parking_lot::Mutex;

// ============================================================================
// Helper
// ============================================================================

fn square_points() -> DataList {
    DataList::from_points(&[
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
    ])
}

fn recorded(g: &Geometry) -> Arc<Mutex<Vec<GeometryEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    g.add_geometry_listener(move |e| sink.lock().push(e.clone()));
    events
}

// ============================================================================
// Counts
// ============================================================================

#[test]
fn count_reset_discards_all_lists_of_category() {
    let g = Geometry::indexed_face_set();
    g.set_num_entries(Category::Vertex, 4).unwrap();
    g.set_vertex_coordinates(square_points()).unwrap();
    g.set_attributes(Category::Vertex, Attribute::Labels, DataList::strings(&["a", "b", "c", "d"]))
        .unwrap();
    g.set_num_entries(Category::Face, 1).unwrap();
    g.set_attributes(Category::Face, Attribute::Indices, DataList::int_rows(&[[0, 1, 2, 3]]))
        .unwrap();

    g.set_num_entries(Category::Vertex, 8).unwrap();

    assert_eq!(g.num_points(), 8);
    assert!(g.attributes(Category::Vertex).unwrap().is_empty());
    // Other categories are untouched
    assert_eq!(g.num_faces(), 1);
    assert!(g.face_indices().is_some());
}

#[test]
fn mismatched_list_is_rejected() {
    let g = Geometry::point_set();
    g.set_num_entries(Category::Vertex, 3).unwrap();

    let err = g.set_vertex_coordinates(square_points()).unwrap_err();
    assert_eq!(
        err,
        SceneError::LengthMismatch {
            attribute: "coordinates".into(),
            expected: 3,
            actual: 4
        }
    );
    assert!(g.vertex_coordinates().is_none());
    assert_eq!(g.num_points(), 3);
}

#[test]
fn list_set_of_wrong_length_is_rejected() {
    let g = Geometry::point_set();
    g.set_num_entries(Category::Vertex, 4).unwrap();

    let short = AttributeListSet::new(2)
        .with(Attribute::Labels, DataList::strings(&["a", "b"]))
        .unwrap()
        .with(Attribute::RelativeRadii, DataList::doubles(vec![1.0, 2.0]))
        .unwrap();

    assert!(matches!(
        g.set_attribute_set(Category::Vertex, &short),
        Err(SceneError::LengthMismatch { expected: 4, actual: 2, .. })
    ));
    assert!(g.attributes(Category::Vertex).unwrap().is_empty());
}

#[test]
fn zero_width_tuples_are_rejected() {
    let g = Geometry::point_set();
    let events = recorded(&g);
    let list = DataList::DoubleTuples {
        data: Vec::<f64>::new().into(),
        width: 0,
    };

    let err = g
        .set_attributes(Category::Vertex, Attribute::Coordinates, list)
        .unwrap_err();
    assert!(matches!(err, SceneError::InvalidArgument(_)));
    assert!(g.vertex_coordinates().is_none());
    assert_eq!(g.num_points(), 0);
    assert!(events.lock().is_empty());
}

#[test]
fn count_and_attributes_in_one_step() {
    let g = Geometry::indexed_line_set();
    let events = recorded(&g);

    let edges = AttributeListSet::new(2)
        .with(Attribute::Indices, DataList::int_rows(&[vec![0, 1], vec![1, 2, 3]]))
        .unwrap();
    g.set_count_and_attributes(Category::Edge, &edges).unwrap();

    assert_eq!(g.num_edges(), 2);
    assert_eq!(g.edge_indices().unwrap().index_row(1), Some(&[1, 2, 3][..]));

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].changes, GeometryChanges::EDGE);
    assert_eq!(events[0].edge_attributes, vec![Attribute::Indices]);
}

#[test]
fn unsupported_category_is_an_error() {
    let g = Geometry::new(GeometryKind::Plain);
    assert_eq!(
        g.set_num_entries(Category::Vertex, 1),
        Err(SceneError::UnsupportedCategory {
            kind: "plain",
            category: "vertex"
        })
    );
    assert!(g.attribute(Category::Vertex, &Attribute::Coordinates).is_none());
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn batch_changes_merge_into_one_event() {
    let g = Geometry::indexed_face_set();
    let events = recorded(&g);

    g.run_as_writer(|| {
        g.set_num_entries(Category::Vertex, 4).unwrap();
        g.set_vertex_coordinates(square_points()).unwrap();
        g.set_num_entries(Category::Face, 1).unwrap();
        g.set_attributes(Category::Face, Attribute::Indices, DataList::int_rows(&[[0, 1, 2, 3]]))
            .unwrap();
        g.set_geometry_attribute("name", "square").unwrap();
    })
    .unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(
        event.changes,
        GeometryChanges::VERTEX | GeometryChanges::FACE | GeometryChanges::GEOMETRY
    );
    assert_eq!(event.vertex_attributes, vec![Attribute::Coordinates]);
    assert_eq!(event.face_attributes, vec![Attribute::Indices]);
    assert!(event.edge_attributes.is_empty());
    assert_eq!(event.geometry_attributes, vec!["name".to_string()]);
    assert_eq!(event.source.id(), g.id());
}

#[test]
fn failed_write_fires_nothing() {
    let g = Geometry::point_set();
    let events = recorded(&g);
    assert!(g.set_vertex_coordinates(square_points()).is_err());
    assert!(events.lock().is_empty());
}
