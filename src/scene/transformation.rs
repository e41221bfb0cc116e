use std::fmt;
use std::sync::{Arc, Weak};

use glam::{DMat4, DVec3};
use parking_lot::RwLock;

use crate::errors::{Result, SceneError};
use crate::scene::events::TransformationEvent;
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode};
use crate::settings::LockPolicy;

#[derive(Debug)]
struct TransformationState {
    matrix: DMat4,
    changed: bool,
}

/// 4x4 homogeneous transformation, identity by default.
///
/// The matrix maps the component's local coordinates to its parent's.
/// Row-major accessors are provided for callers that exchange flat arrays.
pub struct Transformation {
    core: NodeCore,
    self_ref: Weak<Transformation>,
    state: RwLock<TransformationState>,
    listeners: Listeners<Callback<TransformationEvent>>,
}

impl Transformation {
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
            core: NodeCore::new(NodeKind::Transformation, name, policy),
            self_ref: self_ref.clone(),
            state: RwLock::new(TransformationState {
                matrix: DMat4::IDENTITY,
                changed: false,
            }),
            listeners: Listeners::new(),
        })
    }

    #[must_use]
    pub fn from_matrix(matrix: DMat4) -> Arc<Self> {
        let t = Self::new();
        t.state.write().matrix = matrix;
        t
    }

    #[must_use]
    pub fn from_translation(translation: DVec3) -> Arc<Self> {
        Self::from_matrix(DMat4::from_translation(translation))
    }

    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        self.run_as_reader(|| self.state.read().matrix)
    }

    /// The matrix as 16 values in row-major order.
    #[must_use]
    pub fn matrix_row_major(&self) -> [f64; 16] {
        self.matrix().transpose().to_cols_array()
    }

    #[must_use]
    pub fn translation(&self) -> DVec3 {
        self.matrix().w_axis.truncate()
    }

    pub fn inverse_matrix(&self) -> Result<DMat4> {
        invert(self.matrix())
    }

    pub fn set_matrix(&self, matrix: DMat4) -> Result<()> {
        self.update(|m| *m = matrix)
    }

    pub fn set_matrix_row_major(&self, values: &[f64; 16]) -> Result<()> {
        self.set_matrix(DMat4::from_cols_array(values).transpose())
    }

    pub fn set_translation(&self, translation: DVec3) -> Result<()> {
        self.update(|m| m.w_axis = translation.extend(m.w_axis.w))
    }

    /// `M := T · M`
    pub fn multiply_on_left(&self, t: DMat4) -> Result<()> {
        self.update(|m| *m = t * *m)
    }

    /// `M := M · T`
    pub fn multiply_on_right(&self, t: DMat4) -> Result<()> {
        self.update(|m| *m *= t)
    }

    fn update(&self, f: impl FnOnce(&mut DMat4)) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            f(&mut state.matrix);
            state.changed = true;
        })
    }

    pub fn add_transformation_listener(
        &self,
        listener: impl Fn(&TransformationEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_transformation_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

pub(crate) fn invert(matrix: DMat4) -> Result<DMat4> {
    let det = matrix.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(SceneError::SingularMatrix);
    }
    Ok(matrix.inverse())
}

impl SceneGraphNode for Transformation {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn writing_finished(&self) {
        let matrix = {
            let mut state = self.state.write();
            if !std::mem::take(&mut state.changed) {
                return;
            }
            state.matrix
        };
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        let event = TransformationEvent { source, matrix };
        self.listeners.notify(&self.core, |listener| listener(&event));
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformation")
            .field("core", &self.core)
            .field("matrix", &self.state.read().matrix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let t = Transformation::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let rows = t.matrix_row_major();
        assert_eq!(rows[3], 1.0);
        assert_eq!(rows[7], 2.0);
        assert_eq!(rows[11], 3.0);
        assert_eq!(rows[15], 1.0);

        t.set_matrix_row_major(&rows).unwrap();
        assert_eq!(t.translation(), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_multiply_order() {
        let t = Transformation::from_translation(DVec3::X);
        let s = DMat4::from_scale(DVec3::splat(2.0));

        t.multiply_on_right(s).unwrap();
        assert_eq!(t.translation(), DVec3::X);

        t.multiply_on_left(s).unwrap();
        assert_eq!(t.translation(), DVec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let t = Transformation::from_matrix(DMat4::from_scale(DVec3::new(1.0, 0.0, 1.0)));
        assert_eq!(t.inverse_matrix(), Err(SceneError::SingularMatrix));
    }
}
