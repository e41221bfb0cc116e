//! Error Types
//!
//! This module defines the error types used throughout the scene graph.
//!
//! # Overview
//!
//! The main error type [`SceneError`] covers every failure a caller can
//! provoke through the public API:
//! - Lock misuse (unlocking without owning, invalid downgrade)
//! - Mutation of read-only nodes
//! - Cycles introduced through `add_child`
//! - Invalid arguments (type mismatches, wrong list lengths)
//!
//! All of them are raised before any state is touched, so a failed call
//! leaves the node exactly as it was.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SceneError>`.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arbor::errors::{Result, SceneError};
//! use arbor::scene::SceneGraphComponent;
//!
//! fn build(root: &SceneGraphComponent, child: Arc<SceneGraphComponent>) -> Result<()> {
//!     root.add_child(&child)?;
//!     Ok(())
//! }
//!
//! let root = SceneGraphComponent::with_name("root");
//! let child = SceneGraphComponent::with_name("child");
//! build(&root, Arc::clone(&child)).unwrap();
//! assert!(matches!(
//!     child.add_child(&root),
//!     Err(SceneError::Loop { .. })
//! ));
//! ```

use thiserror::Error;

/// The main error type for the scene graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    // ========================================================================
    // Lock Protocol Errors
    // ========================================================================
    /// The lock state machine was driven into an invalid transition.
    #[error("Illegal lock state: {0}")]
    IllegalState(String),

    // ========================================================================
    // Mutation Errors
    // ========================================================================
    /// A mutator was called on a node flagged read-only.
    #[error("Node '{0}' is read-only")]
    ReadOnly(String),

    /// `add_child` would have introduced a cycle.
    #[error("Loop detected: '{child}' cannot be attached below '{parent}'")]
    Loop {
        /// Name of the component that was being attached to
        parent: String,
        /// Name of the rejected child
        child: String,
    },

    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// An argument was rejected before any mutation took place.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A data list did not match the entry count of its category.
    #[error("Length mismatch for {attribute}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        /// Attribute whose list was rejected
        attribute: String,
        /// Current entry count of the category
        expected: usize,
        /// Element count of the incoming list
        actual: usize,
    },

    /// The geometry kind does not carry the requested attribute category.
    #[error("{kind} geometry has no {category} attributes")]
    UnsupportedCategory {
        /// Kind of the geometry node
        kind: &'static str,
        /// Requested category
        category: &'static str,
    },

    /// An index-based accessor was called with an out-of-range index.
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length of the sequence
        len: usize,
    },

    /// A matrix that must be inverted has a zero determinant.
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Scene settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(String),
}

impl From<serde_json::Error> for SceneError {
    fn from(err: serde_json::Error) -> Self {
        SceneError::Settings(err.to_string())
    }
}

/// Alias for `Result<T, SceneError>`.
pub type Result<T> = std::result::Result<T, SceneError>;
