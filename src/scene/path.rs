//! Paths from a root component to a node.
//!
//! A path names one occurrence of a node in the tree; since a component may
//! have several parents, the same node can be reached along several paths.
//! Paths are plain values: they do not observe the tree, and
//! [`SceneGraphPath::is_valid`] tells whether one still matches it.

use std::fmt;
use std::sync::Arc;

use glam::DMat4;

use crate::errors::{Result, SceneError};
use crate::scene::component::SceneGraphComponent;
use crate::scene::node::SceneNode;
use crate::scene::transformation::invert;

/// Ordered node list `[root, ..., last]`.
///
/// Equality and hashing compare the node sequence by node identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SceneGraphPath {
    nodes: Vec<SceneNode>,
}

impl SceneGraphPath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_nodes(nodes: impl IntoIterator<Item = SceneNode>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: impl Into<SceneNode>) {
        self.nodes.push(node.into());
    }

    pub fn pop(&mut self) -> Option<SceneNode> {
        self.nodes.pop()
    }

    /// Copy of this path extended by `node`.
    #[must_use]
    pub fn push_new(&self, node: impl Into<SceneNode>) -> Self {
        let mut path = self.clone();
        path.push(node);
        path
    }

    /// Copy of this path without its last node.
    #[must_use]
    pub fn pop_new(&self) -> Self {
        let mut path = self.clone();
        path.pop();
        path
    }

    #[must_use]
    pub fn first(&self) -> Option<&SceneNode> {
        self.nodes.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&SceneNode> {
        self.nodes.last()
    }

    /// Last component of the path: the last node itself when it is a
    /// component, else the one holding it.
    #[must_use]
    pub fn last_component(&self) -> Option<&Arc<SceneGraphComponent>> {
        self.nodes.iter().rev().find_map(SceneNode::as_component)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SceneNode> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn contains(&self, node: &SceneNode) -> bool {
        self.nodes.contains(node)
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &SceneGraphPath) -> bool {
        self.nodes.starts_with(&prefix.nodes)
    }

    /// Whether every node but the last is a component and each node is a
    /// direct child or slot content of its predecessor.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.nodes.windows(2).all(|pair| {
            pair[0]
                .as_component()
                .is_some_and(|parent| parent.is_direct_ancestor(&pair[1]))
        })
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Product of the transformations of every component on the path,
    /// root first: `T(root) · ... · T(last)`.
    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        Self::compose(&self.nodes)
    }

    /// Like [`matrix`](Self::matrix) over the nodes `begin..=end`.
    pub fn matrix_range(&self, begin: usize, end: usize) -> Result<DMat4> {
        Ok(Self::compose(self.range(begin, end)?))
    }

    pub fn inverse_matrix(&self) -> Result<DMat4> {
        invert(self.matrix())
    }

    pub fn inverse_matrix_range(&self, begin: usize, end: usize) -> Result<DMat4> {
        invert(self.matrix_range(begin, end)?)
    }

    fn range(&self, begin: usize, end: usize) -> Result<&[SceneNode]> {
        if end >= self.nodes.len() {
            return Err(SceneError::IndexOutOfRange {
                index: end,
                len: self.nodes.len(),
            });
        }
        if begin > end {
            return Err(SceneError::InvalidArgument(format!(
                "path range {begin}..={end} is reversed"
            )));
        }
        Ok(&self.nodes[begin..=end])
    }

    fn compose(nodes: &[SceneNode]) -> DMat4 {
        nodes
            .iter()
            .filter_map(SceneNode::as_component)
            .filter_map(|c| c.transformation())
            .fold(DMat4::IDENTITY, |m, t| m * t.matrix())
    }
}

impl<'a> IntoIterator for &'a SceneGraphPath {
    type Item = &'a SceneNode;
    type IntoIter = std::slice::Iter<'a, SceneNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<SceneNode> for SceneGraphPath {
    fn from_iter<I: IntoIterator<Item = SceneNode>>(iter: I) -> Self {
        Self::from_nodes(iter)
    }
}

impl fmt::Display for SceneGraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(" : ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::scene::node::SceneGraphNode;
    use crate::scene::transformation::Transformation;

    #[test]
    fn test_range_must_fit_path() {
        let root = SceneGraphComponent::new();
        let path = SceneGraphPath::from_nodes([SceneNode::from(&root)]);
        assert!(path.matrix_range(0, 0).is_ok());
        assert!(matches!(
            path.matrix_range(0, 1),
            Err(SceneError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            path.pop_new().push_new(&root).push_new(&root).matrix_range(1, 0),
            Err(SceneError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_last_component_skips_leaf() {
        let root = SceneGraphComponent::new();
        let t = Transformation::from_translation(DVec3::X);
        root.set_transformation(Some(Arc::clone(&t))).unwrap();

        let path = SceneGraphPath::new().push_new(&root).push_new(&t);
        assert!(path.is_valid());
        assert_eq!(path.last_component().map(Arc::as_ptr), Some(Arc::as_ptr(&root)));
        assert_eq!(path.to_string(), format!("{} : {}", root.name(), t.name()));
    }
}
