//! Synchronization primitives shared by every node.

pub mod lock;

pub use lock::{SceneLock, SceneReadGuard, SceneWriteGuard};
