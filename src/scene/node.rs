use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::appearance::Appearance;
use crate::diagnostics;
use crate::errors::{Result, SceneError};
use crate::geometry::Geometry;
use crate::scene::audio::AudioSource;
use crate::scene::camera::Camera;
use crate::scene::component::SceneGraphComponent;
use crate::scene::light::Light;
use crate::scene::transformation::Transformation;
use crate::settings::LockPolicy;
use crate::sync::SceneLock;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

static UNNAMED_COUNTERS: [AtomicU64; NodeKind::COUNT] = [const { AtomicU64::new(0) }; NodeKind::COUNT];

/// Concrete node type, used for auto-naming and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Component,
    Transformation,
    Appearance,
    Camera,
    Light,
    Geometry,
    AudioSource,
}

impl NodeKind {
    const COUNT: usize = 7;

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Component => "component",
            NodeKind::Transformation => "transformation",
            NodeKind::Appearance => "appearance",
            NodeKind::Camera => "camera",
            NodeKind::Light => "light",
            NodeKind::Geometry => "geometry",
            NodeKind::AudioSource => "audio source",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Next name for an unnamed node of this kind. Counters are per kind, so
    /// names repeat across kinds.
    fn next_unnamed(self) -> String {
        let n = UNNAMED_COUNTERS[self.index()].fetch_add(1, Ordering::Relaxed);
        format!("{} {n}", self.label())
    }
}

// ============================================================================
// NodeCore
// ============================================================================

/// State shared by every node: identity, name, flags and the node's lock.
///
/// # Batching
///
/// Reads and writes go through batches. A read batch holds the node's read
/// role for its duration, so several accessor calls observe one consistent
/// state. A write batch holds the write role; when the outermost write batch
/// ends the lock is downgraded to the read role and the node's
/// [`SceneGraphNode::writing_finished`] hook flushes queued change events.
/// With a non-thread-safe [`LockPolicy`] no lock is taken at all.
pub struct NodeCore {
    id: u64,
    kind: NodeKind,
    name: RwLock<String>,
    read_only: AtomicBool,
    owner: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    lock: SceneLock,
    policy: LockPolicy,
    unsync_depth: AtomicU32,
}

impl NodeCore {
    #[must_use]
    pub fn new(kind: NodeKind, name: Option<&str>, policy: LockPolicy) -> Self {
        let name = name.map_or_else(|| kind.next_unnamed(), str::to_string);
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            name: RwLock::new(name),
            read_only: AtomicBool::new(false),
            owner: RwLock::new(None),
            lock: SceneLock::new(),
            policy,
            unsync_depth: AtomicU32::new(0),
        }
    }

    /// Process-unique node id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn lock(&self) -> &SceneLock {
        &self.lock
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    /// Name without taking the read role. Used in diagnostics, where the
    /// calling thread may already be inside a batch of this node.
    pub(crate) fn name_unlocked(&self) -> String {
        self.name.read().clone()
    }

    /// Runs `body` while holding the read role.
    ///
    /// The role is released on every exit path, including unwinding.
    pub fn run_as_reader<R>(&self, body: impl FnOnce() -> R) -> R {
        let _guard = self.policy.is_thread_safe().then(|| self.lock.read());
        body()
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &*self.name.read())
            .field("read_only", &self.read_only.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SceneGraphNode
// ============================================================================

/// Behaviour shared by every node type.
pub trait SceneGraphNode: Send + Sync + fmt::Debug {
    fn core(&self) -> &NodeCore;

    /// Flushes change events queued during a write batch.
    ///
    /// Called once per outermost write batch, after the writer has been
    /// downgraded to the read role.
    fn writing_finished(&self) {}

    #[inline]
    fn id(&self) -> u64 {
        self.core().id()
    }

    #[inline]
    fn kind(&self) -> NodeKind {
        self.core().kind()
    }

    fn name(&self) -> String {
        let core = self.core();
        core.run_as_reader(|| core.name_unlocked())
    }

    #[inline]
    fn is_read_only(&self) -> bool {
        self.core().read_only.load(Ordering::Acquire)
    }

    fn set_read_only(&self, read_only: bool) {
        self.core().read_only.store(read_only, Ordering::Release);
    }

    fn check_writable(&self) -> Result<()> {
        if self.is_read_only() {
            let name = self.core().name_unlocked();
            log::warn!("Rejected mutation of read-only node '{name}'");
            return Err(SceneError::ReadOnly(name));
        }
        Ok(())
    }

    fn owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        let core = self.core();
        core.run_as_reader(|| core.owner.read().clone())
    }

    fn set_name(&self, name: &str) -> Result<()>
    where
        Self: Sized,
    {
        self.check_writable()?;
        self.run_as_writer(|| *self.core().name.write() = name.to_string())
    }

    fn set_owner(&self, owner: Option<Arc<dyn Any + Send + Sync>>) -> Result<()>
    where
        Self: Sized,
    {
        self.check_writable()?;
        self.run_as_writer(|| *self.core().owner.write() = owner)
    }

    fn run_as_reader<R>(&self, body: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        self.core().run_as_reader(body)
    }

    /// Runs `body` as a write batch. Notifications fire when the outermost
    /// batch on this node completes.
    fn run_as_writer<R>(&self, body: impl FnOnce() -> R) -> Result<R>
    where
        Self: Sized,
    {
        let batch = WriteBatch::begin(self)?;
        let result = body();
        drop(batch);
        Ok(result)
    }

    /// Like [`run_as_writer`](Self::run_as_writer) for fallible bodies.
    fn try_run_as_writer<R>(&self, body: impl FnOnce() -> Result<R>) -> Result<R>
    where
        Self: Sized,
    {
        self.run_as_writer(body)?
    }
}

// ============================================================================
// WriteBatch
// ============================================================================

/// An open write batch on one node.
///
/// Dropping the batch ends it. For the outermost batch this downgrades the
/// lock, runs the node's notification hook behind a panic boundary and
/// releases the read role; nested batches only release one write level.
#[must_use = "the write batch ends as soon as it is dropped"]
pub struct WriteBatch<'a> {
    node: &'a dyn SceneGraphNode,
    locked: bool,
}

impl<'a> WriteBatch<'a> {
    pub fn begin(node: &'a dyn SceneGraphNode) -> Result<Self> {
        let core = node.core();
        let locked = core.policy.is_thread_safe();
        if locked {
            core.lock.write_lock()?;
        } else {
            core.unsync_depth.fetch_add(1, Ordering::AcqRel);
        }
        Ok(Self { node, locked })
    }
}

impl Drop for WriteBatch<'_> {
    fn drop(&mut self) {
        let core = self.node.core();

        if !self.locked {
            if core.unsync_depth.fetch_sub(1, Ordering::AcqRel) == 1 {
                finish_writing(self.node);
            }
            return;
        }

        if core.lock.can_switch_to_read() {
            if let Err(err) = core.lock.switch_to_read_lock() {
                log::error!("Write batch on '{}' could not downgrade: {err}", core.name_unlocked());
                return;
            }
            finish_writing(self.node);
            if let Err(err) = core.lock.read_unlock() {
                log::error!("Write batch on '{}' could not release: {err}", core.name_unlocked());
            }
        } else if let Err(err) = core.lock.write_unlock() {
            log::error!("Write batch on '{}' could not release: {err}", core.name_unlocked());
        }
    }
}

fn finish_writing(node: &dyn SceneGraphNode) {
    diagnostics::isolate(|| node.core().name_unlocked(), || node.writing_finished());
}

impl fmt::Debug for WriteBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch")
            .field("node", &self.node.core().id())
            .field("locked", &self.locked)
            .finish()
    }
}

// ============================================================================
// SceneNode
// ============================================================================

/// Any node of the scene graph, as a closed set of variants.
///
/// Equality and hashing use node identity, not contents.
#[derive(Debug, Clone)]
pub enum SceneNode {
    Component(Arc<SceneGraphComponent>),
    Transformation(Arc<Transformation>),
    Appearance(Arc<Appearance>),
    Camera(Arc<Camera>),
    Light(Arc<Light>),
    Geometry(Arc<Geometry>),
    AudioSource(Arc<AudioSource>),
}

impl SceneNode {
    #[must_use]
    pub fn as_node(&self) -> &dyn SceneGraphNode {
        match self {
            SceneNode::Component(n) => n.as_ref(),
            SceneNode::Transformation(n) => n.as_ref(),
            SceneNode::Appearance(n) => n.as_ref(),
            SceneNode::Camera(n) => n.as_ref(),
            SceneNode::Light(n) => n.as_ref(),
            SceneNode::Geometry(n) => n.as_ref(),
            SceneNode::AudioSource(n) => n.as_ref(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.as_node().id()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.as_node().kind()
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.as_node().name()
    }

    #[must_use]
    pub fn as_component(&self) -> Option<&Arc<SceneGraphComponent>> {
        match self {
            SceneNode::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Opens a write batch on the wrapped node.
    pub fn begin_write(&self) -> Result<WriteBatch<'_>> {
        WriteBatch::begin(self.as_node())
    }
}

impl PartialEq for SceneNode {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SceneNode {}

impl Hash for SceneNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

macro_rules! impl_scene_node_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<Arc<$ty>> for SceneNode {
                fn from(node: Arc<$ty>) -> Self {
                    SceneNode::$variant(node)
                }
            }

            impl From<&Arc<$ty>> for SceneNode {
                fn from(node: &Arc<$ty>) -> Self {
                    SceneNode::$variant(Arc::clone(node))
                }
            }
        )*
    };
}

impl_scene_node_from! {
    Component => SceneGraphComponent,
    Transformation => Transformation,
    Appearance => Appearance,
    Camera => Camera,
    Light => Light,
    Geometry => Geometry,
    AudioSource => AudioSource,
}
