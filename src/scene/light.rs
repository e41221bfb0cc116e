use std::f64::consts::PI;
use std::fmt;
use std::sync::{Arc, Weak};

use glam::{DVec3, Vec4};
use parking_lot::RwLock;

use crate::errors::{Result, SceneError};
use crate::scene::events::LightEvent;
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode};
use crate::settings::LockPolicy;

/// Attenuation `1 / (a0 + a1·d + a2·d²)` of positional lights.
pub const DEFAULT_FALLOFF: DVec3 = DVec3::new(0.5, 0.5, 0.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel light along the local -Z axis.
    Directional,
    Point {
        falloff: DVec3,
    },
    /// Point light restricted to a cone around the local -Z axis.
    Spot {
        falloff: DVec3,
        /// Half-angle of the cone, in radians.
        cone_angle: f64,
        /// Width of the soft edge inside the cone, in radians.
        cone_delta: f64,
        /// Exponent of the intensity distribution across the cone.
        distribution: f64,
    },
}

impl LightKind {
    #[must_use]
    pub fn point() -> Self {
        LightKind::Point {
            falloff: DEFAULT_FALLOFF,
        }
    }

    #[must_use]
    pub fn spot() -> Self {
        LightKind::Spot {
            falloff: DEFAULT_FALLOFF,
            cone_angle: PI / 6.0,
            cone_delta: PI / 18.0,
            distribution: 2.0,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            LightKind::Directional => "directional",
            LightKind::Point { .. } => "point",
            LightKind::Spot { .. } => "spot",
        }
    }
}

#[derive(Debug, Clone)]
struct LightState {
    kind: LightKind,
    color: Vec4,
    intensity: f64,
    /// Global lights illuminate the whole scene, local ones only the
    /// subtree of the component holding them.
    global: bool,
    changed: bool,
}

pub struct Light {
    core: NodeCore,
    self_ref: Weak<Light>,
    state: RwLock<LightState>,
    listeners: Listeners<Callback<LightEvent>>,
}

impl Light {
    #[must_use]
    pub fn new(kind: LightKind) -> Arc<Self> {
        Self::with_policy(kind, None, LockPolicy::global())
    }

    #[must_use]
    pub fn with_name(kind: LightKind, name: &str) -> Arc<Self> {
        Self::with_policy(kind, Some(name), LockPolicy::global())
    }

    #[must_use]
    pub fn with_policy(kind: LightKind, name: Option<&str>, policy: LockPolicy) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            core: NodeCore::new(NodeKind::Light, name, policy),
            self_ref: self_ref.clone(),
            state: RwLock::new(LightState {
                kind,
                color: Vec4::ONE,
                intensity: 0.75,
                global: true,
                changed: false,
            }),
            listeners: Listeners::new(),
        })
    }

    #[must_use]
    pub fn directional() -> Arc<Self> {
        Self::new(LightKind::Directional)
    }

    #[must_use]
    pub fn light_kind(&self) -> LightKind {
        self.run_as_reader(|| self.state.read().kind)
    }

    pub fn set_light_kind(&self, kind: LightKind) -> Result<()> {
        self.update(|state| state.kind = kind)
    }

    // -- Positional light parameters --

    pub fn falloff(&self) -> Result<DVec3> {
        match self.light_kind() {
            LightKind::Point { falloff } | LightKind::Spot { falloff, .. } => Ok(falloff),
            kind @ LightKind::Directional => Err(wrong_kind(kind, "falloff")),
        }
    }

    pub fn set_falloff(&self, value: DVec3) -> Result<()> {
        self.try_update(|kind| match kind {
            LightKind::Point { falloff } | LightKind::Spot { falloff, .. } => {
                *falloff = value;
                Ok(())
            }
            LightKind::Directional => Err(wrong_kind(*kind, "falloff")),
        })
    }

    pub fn cone_angle(&self) -> Result<f64> {
        match self.light_kind() {
            LightKind::Spot { cone_angle, .. } => Ok(cone_angle),
            kind => Err(wrong_kind(kind, "cone angle")),
        }
    }

    pub fn set_cone_angle(&self, value: f64) -> Result<()> {
        self.try_update(|kind| match kind {
            LightKind::Spot { cone_angle, .. } => {
                *cone_angle = value;
                Ok(())
            }
            other => Err(wrong_kind(*other, "cone angle")),
        })
    }

    pub fn cone_delta(&self) -> Result<f64> {
        match self.light_kind() {
            LightKind::Spot { cone_delta, .. } => Ok(cone_delta),
            kind => Err(wrong_kind(kind, "cone delta")),
        }
    }

    pub fn set_cone_delta(&self, value: f64) -> Result<()> {
        self.try_update(|kind| match kind {
            LightKind::Spot { cone_delta, .. } => {
                *cone_delta = value;
                Ok(())
            }
            other => Err(wrong_kind(*other, "cone delta")),
        })
    }

    pub fn distribution(&self) -> Result<f64> {
        match self.light_kind() {
            LightKind::Spot { distribution, .. } => Ok(distribution),
            kind => Err(wrong_kind(kind, "distribution")),
        }
    }

    pub fn set_distribution(&self, value: f64) -> Result<()> {
        self.try_update(|kind| match kind {
            LightKind::Spot { distribution, .. } => {
                *distribution = value;
                Ok(())
            }
            other => Err(wrong_kind(*other, "distribution")),
        })
    }

    fn update(&self, f: impl FnOnce(&mut LightState)) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            f(&mut *state);
            state.changed = true;
        })
    }

    /// Edits the kind-specific parameters; the light is left untouched when
    /// `f` fails.
    fn try_update(&self, f: impl FnOnce(&mut LightKind) -> Result<()>) -> Result<()> {
        self.check_writable()?;
        self.try_run_as_writer(|| {
            let mut state = self.state.write();
            f(&mut state.kind)?;
            state.changed = true;
            Ok(())
        })
    }

    pub fn add_light_listener(
        &self,
        listener: impl Fn(&LightEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_light_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

fn wrong_kind(kind: LightKind, parameter: &str) -> SceneError {
    SceneError::InvalidArgument(format!("{} lights have no {parameter}", kind.label()))
}

impl_node_properties!(Light, [
    (color, Vec4, "Light color, RGBA."),
    (intensity, f64, "Scale factor applied to the color."),
    (global, bool, "Whether the light illuminates the whole scene."),
]);

impl SceneGraphNode for Light {
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
        let event = LightEvent { source };
        self.listeners.notify(&self.core, |listener| listener(&event));
    }
}

impl fmt::Debug for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Light")
            .field("core", &self.core)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}
