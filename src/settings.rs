//! Scene Settings & Lock Policy
//!
//! This module defines how a tree of nodes synchronizes access.
//!
//! The core abstraction is [`LockPolicy`], a shared switch that every node
//! consults before touching its lock. Nodes created without an explicit
//! policy share the process-wide default policy, which is what
//! [`set_thread_safe`] toggles. Independent trees can be built with their own
//! policy obtained from [`SceneSettings::policy`], so one tree can run
//! unsynchronized while another in the same process keeps full locking.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use arbor::settings::SceneSettings;
//! use arbor::scene::SceneGraphComponent;
//!
//! // Single-threaded tool: skip all locking for this tree only
//! let settings = SceneSettings { thread_safe: false };
//! let policy = settings.policy();
//! let root = SceneGraphComponent::with_policy(Some("root"), policy.clone());
//! ```
//!
//! Toggling a policy while other threads are inside read or write batches of
//! nodes that use it is unsupported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// SceneSettings
// ---------------------------------------------------------------------------

/// Construction-time configuration for a tree of nodes.
///
/// Settings are plain data: they can be built in code, or parsed from JSON
/// with [`SceneSettings::from_json`]. Missing fields fall back to their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Whether nodes acquire their read/write lock inside batches.
    ///
    /// Disabling it turns every `run_as_reader` / `run_as_writer` into a
    /// direct call. Change notifications still fire once per outermost
    /// write batch.
    pub thread_safe: bool,
}

impl Default for SceneSettings {
    #[inline]
    fn default() -> Self {
        Self { thread_safe: true }
    }
}

impl SceneSettings {
    /// Parses settings from a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the settings to a JSON document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Creates a fresh policy, independent of the process-wide default.
    #[must_use]
    pub fn policy(&self) -> LockPolicy {
        LockPolicy::new(self.thread_safe)
    }
}

// ---------------------------------------------------------------------------
// LockPolicy
// ---------------------------------------------------------------------------

static DEFAULT_POLICY: Lazy<LockPolicy> = Lazy::new(|| LockPolicy::new(true));

/// Shared thread-safety switch consulted by every node on each lock and
/// unlock.
///
/// Cloning a policy yields a handle to the same switch.
#[derive(Debug, Clone)]
pub struct LockPolicy {
    thread_safe: Arc<AtomicBool>,
}

impl LockPolicy {
    #[must_use]
    pub fn new(thread_safe: bool) -> Self {
        Self {
            thread_safe: Arc::new(AtomicBool::new(thread_safe)),
        }
    }

    /// Returns a handle to the process-wide default policy.
    #[must_use]
    pub fn global() -> Self {
        DEFAULT_POLICY.clone()
    }

    #[inline]
    #[must_use]
    pub fn is_thread_safe(&self) -> bool {
        self.thread_safe.load(Ordering::Acquire)
    }

    pub fn set_thread_safe(&self, thread_safe: bool) {
        self.thread_safe.store(thread_safe, Ordering::Release);
    }

    /// Returns `true` when both handles refer to the same switch.
    #[must_use]
    pub fn same_policy(&self, other: &LockPolicy) -> bool {
        Arc::ptr_eq(&self.thread_safe, &other.thread_safe)
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::global()
    }
}

/// Enables or disables locking for every node built on the default policy.
pub fn set_thread_safe(thread_safe: bool) {
    DEFAULT_POLICY.set_thread_safe(thread_safe);
}

/// Returns the state of the process-wide default policy.
#[must_use]
pub fn is_thread_safe() -> bool {
    DEFAULT_POLICY.is_thread_safe()
}
