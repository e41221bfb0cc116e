//! Per-element data stored under an [`Attribute`](super::Attribute).

use std::sync::Arc;

use glam::DVec3;

use crate::errors::{Result, SceneError};

/// Immutable list with one entry per element of a category.
///
/// Lists share their storage, so cloning is cheap and a geometry never
/// observes later edits by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DataList {
    /// One scalar per element.
    Doubles(Arc<[f64]>),
    /// Fixed-width tuples, e.g. 3 or 4 coordinates per vertex.
    DoubleTuples { data: Arc<[f64]>, width: usize },
    Ints(Arc<[i32]>),
    /// Variable-length index rows, e.g. the vertex indices of each face.
    IntRows(Arc<[Arc<[i32]>]>),
    Strings(Arc<[Arc<str>]>),
}

impl DataList {
    #[must_use]
    pub fn doubles(values: impl Into<Arc<[f64]>>) -> Self {
        DataList::Doubles(values.into())
    }

    /// Flat data cut into tuples of `width`.
    pub fn double_tuples(data: impl Into<Arc<[f64]>>, width: usize) -> Result<Self> {
        let data = data.into();
        if width == 0 || data.len() % width != 0 {
            return Err(SceneError::InvalidArgument(format!(
                "{} values cannot be split into tuples of {width}",
                data.len()
            )));
        }
        Ok(DataList::DoubleTuples { data, width })
    }

    #[must_use]
    pub fn from_points(points: &[DVec3]) -> Self {
        let data: Vec<f64> = points.iter().flat_map(|p| p.to_array()).collect();
        DataList::DoubleTuples {
            data: data.into(),
            width: 3,
        }
    }

    #[must_use]
    pub fn ints(values: impl Into<Arc<[i32]>>) -> Self {
        DataList::Ints(values.into())
    }

    #[must_use]
    pub fn int_rows<R: AsRef<[i32]>>(rows: &[R]) -> Self {
        DataList::IntRows(rows.iter().map(|row| Arc::from(row.as_ref())).collect())
    }

    #[must_use]
    pub fn strings<S: AsRef<str>>(values: &[S]) -> Self {
        DataList::Strings(values.iter().map(|s| Arc::from(s.as_ref())).collect())
    }

    /// Number of elements described by this list.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            DataList::Doubles(v) => v.len(),
            DataList::DoubleTuples { data, width } => data.len().checked_div(*width).unwrap_or(0),
            DataList::Ints(v) => v.len(),
            DataList::IntRows(v) => v.len(),
            DataList::Strings(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tuple of element `index`, for tuple lists.
    #[must_use]
    pub fn tuple(&self, index: usize) -> Option<&[f64]> {
        match self {
            DataList::DoubleTuples { data, width } => {
                let start = index.checked_mul(*width)?;
                data.get(start..start.checked_add(*width)?)
            }
            _ => None,
        }
    }

    /// Index row of element `index`, for row lists.
    #[must_use]
    pub fn index_row(&self, index: usize) -> Option<&[i32]> {
        match self {
            DataList::IntRows(rows) => rows.get(index).map(AsRef::as_ref),
            _ => None,
        }
    }

    /// Element `index` of a 3- or 4-wide tuple list as a point. Homogeneous
    /// tuples are dehomogenized.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<DVec3> {
        let t = self.tuple(index)?;
        match *t {
            [x, y, z] => Some(DVec3::new(x, y, z)),
            [x, y, z, w] if w != 0.0 => Some(DVec3::new(x / w, y / w, z / w)),
            [x, y, z, _] => Some(DVec3::new(x, y, z)),
            _ => None,
        }
    }
}
