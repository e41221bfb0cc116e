//! Per-node observer lists.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::diagnostics;
use crate::scene::node::NodeCore;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned on registration; pass it back to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Closure listener receiving events of type `E`.
pub type Callback<E> = dyn Fn(&E) + Send + Sync;

/// Ordered list of listeners owned by a node.
///
/// Notification works on a snapshot of the list, so listeners may add or
/// remove listeners (including themselves) while being notified. Each call
/// is isolated: a panicking listener is reported through
/// [`diagnostics`](crate::diagnostics) and the remaining listeners still run.
pub struct Listeners<L: ?Sized> {
    entries: Mutex<SmallVec<[(ListenerId, Arc<L>); 2]>>,
}

impl<L: ?Sized> Listeners<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(SmallVec::new()),
        }
    }

    pub fn add(&self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, listener));
        id
    }

    /// Returns `false` when no listener with that id was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub(crate) fn notify(&self, origin: &NodeCore, deliver: impl Fn(&L)) {
        self.notify_as(|| origin.name_unlocked(), deliver);
    }

    /// Like `notify`, with failures reported under the label from `origin`.
    pub(crate) fn notify_as(&self, origin: impl Fn() -> String, deliver: impl Fn(&L)) {
        let snapshot: SmallVec<[Arc<L>; 2]> = self
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            diagnostics::isolate(&origin, || deliver(&*listener));
        }
    }
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for Listeners<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}
