use std::fmt;
use std::sync::{Arc, Weak};

use glam::DMat4;
use parking_lot::RwLock;

use crate::errors::Result;
use crate::scene::events::CameraEvent;
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode};
use crate::settings::LockPolicy;

#[derive(Debug, Clone)]
struct CameraState {
    near: f64,
    far: f64,
    /// Vertical field of view, in degrees.
    field_of_view: f64,
    focus: f64,
    perspective: bool,
    stereo: bool,
    eye_separation: f64,
    changed: bool,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            near: 0.5,
            far: 50.0,
            field_of_view: 60.0,
            focus: 3.0,
            perspective: true,
            stereo: false,
            eye_separation: 0.07,
            changed: false,
        }
    }
}

/// Viewing parameters. The camera looks down its local -Z axis; its
/// position in the world comes from the path leading to it.
pub struct Camera {
    core: NodeCore,
    self_ref: Weak<Camera>,
    state: RwLock<CameraState>,
    listeners: Listeners<Callback<CameraEvent>>,
}

impl Camera {
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
            core: NodeCore::new(NodeKind::Camera, name, policy),
            self_ref: self_ref.clone(),
            state: RwLock::new(CameraState::default()),
            listeners: Listeners::new(),
        })
    }

    /// Projection for a viewport of the given aspect ratio.
    ///
    /// Orthographic cameras show the extent a perspective camera would show
    /// at the focus distance.
    #[must_use]
    pub fn projection_matrix(&self, aspect: f64) -> DMat4 {
        let s = self.run_as_reader(|| self.state.read().clone());
        let fov = s.field_of_view.to_radians();
        if s.perspective {
            DMat4::perspective_rh_gl(fov, aspect, s.near, s.far)
        } else {
            let half_h = s.focus * (fov / 2.0).tan();
            let half_w = half_h * aspect;
            DMat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, s.near, s.far)
        }
    }

    fn update(&self, f: impl FnOnce(&mut CameraState)) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            f(&mut *state);
            state.changed = true;
        })
    }

    pub fn add_camera_listener(
        &self,
        listener: impl Fn(&CameraEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_camera_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl_node_properties!(Camera, [
    (near, f64, "Distance of the near clipping plane."),
    (far, f64, "Distance of the far clipping plane."),
    (field_of_view, f64, "Vertical field of view in degrees."),
    (focus, f64, "Distance of the plane of zero parallax."),
    (perspective, bool, "Perspective (`true`) or orthographic projection."),
    (stereo, bool, "Whether backends render one image per eye."),
    (eye_separation, f64, "Distance between the eyes in stereo mode."),
]);

impl SceneGraphNode for Camera {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn writing_finished(&self) {
        if !std::mem::take(&mut self.state.write().changed) {
            return;
        }
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        let event = CameraEvent { source };
        self.listeners.notify(&self.core, |listener| listener(&event));
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("core", &self.core)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_one_event_per_batch() {
        let cam = Camera::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        cam.add_camera_listener(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        cam.run_as_writer(|| {
            cam.set_near(0.1).unwrap();
            cam.set_far(100.0).unwrap();
            cam.set_stereo(true).unwrap();
        })
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(cam.far(), 100.0);
        assert!(cam.stereo());
    }
}
