//! Tree walks and multi-node write batches.

use std::sync::Arc;

use crate::errors::Result;
use crate::scene::component::SceneGraphComponent;
use crate::scene::node::{SceneNode, WriteBatch};
use crate::scene::path::SceneGraphPath;

/// Receives the nodes visited by
/// [`SceneGraphComponent::children_accept`].
pub trait SceneGraphVisitor {
    fn visit(&mut self, node: &SceneNode);
}

impl<F> SceneGraphVisitor for F
where
    F: FnMut(&SceneNode),
{
    fn visit(&mut self, node: &SceneNode) {
        self(node);
    }
}

/// Depth-first walk below `root`, calling `f` with the path to every node
/// (root first, then slots and children in traversal order). Shared
/// subtrees are visited once per path leading to them.
pub fn traverse(root: &Arc<SceneGraphComponent>, f: &mut dyn FnMut(&SceneGraphPath)) {
    let path = SceneGraphPath::new().push_new(root);
    f(&path);
    walk(root, &path, f);
}

fn walk(
    component: &SceneGraphComponent,
    path: &SceneGraphPath,
    f: &mut dyn FnMut(&SceneGraphPath),
) {
    component.children_accept(&mut |node: &SceneNode| {
        let path = path.push_new(node.clone());
        f(&path);
        if let Some(child) = node.as_component() {
            walk(child, &path, f);
        }
    });
}

/// Every path from `root` to `target`.
#[must_use]
pub fn paths_between(root: &Arc<SceneGraphComponent>, target: &SceneNode) -> Vec<SceneGraphPath> {
    let mut found = Vec::new();
    traverse(root, &mut |path| {
        if path.last() == Some(target) {
            found.push(path.clone());
        }
    });
    found
}

/// Runs `body` while holding write batches on all `nodes`.
///
/// Batches are opened in ascending node-id order and closed in reverse.
/// Each node fires its own notifications when its batch closes. Duplicate
/// nodes are locked once.
pub fn run_as_writers<R>(nodes: &[SceneNode], body: impl FnOnce() -> R) -> Result<R> {
    let mut ordered: Vec<&SceneNode> = nodes.iter().collect();
    ordered.sort_by_key(|node| node.id());
    ordered.dedup_by_key(|node| node.id());

    let mut batches: Vec<WriteBatch<'_>> = Vec::with_capacity(ordered.len());
    for node in ordered {
        // On failure the batches already opened are closed by the drop of `batches`.
        batches.push(node.begin_write()?);
    }
    let result = body();
    while let Some(batch) = batches.pop() {
        drop(batch);
    }
    Ok(result)
}
