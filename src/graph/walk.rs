//! Graph traversal and one-time cycle detection
//!
//! Node identity is `Arc` pointer identity; nodes have no natural key.
//! `walk` visits in unspecified order (the visited set is unordered), so
//! callers must be order-independent. `detect_cycle` is a structural check
//! meant to run once after graph assembly, not a runtime safety net.

use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::node::Node;

/// Visit every node reachable from `roots` exactly once, in no particular
/// order, deduplicated across all roots.
pub fn walk<F>(f: &mut F, roots: &[Arc<Node>])
where
    F: FnMut(&Arc<Node>),
{
    let mut visited: HashSet<*const Node> = HashSet::new();
    let mut stack: Vec<Arc<Node>> = roots.to_vec();
    while let Some(node) = stack.pop() {
        if !visited.insert(Arc::as_ptr(&node)) {
            continue;
        }
        stack.extend(node.branches());
        f(&node);
    }
}

/// Depth-first search for a cycle reachable from `root`.
///
/// Returns the path from the root down to the node that closes the cycle as
/// evidence, or an empty vector for an acyclic graph. Nodes already explored
/// cycle-free via another path are not re-explored.
pub fn detect_cycle(root: &Arc<Node>) -> Vec<Arc<Node>> {
    let mut path: Vec<Arc<Node>> = Vec::new();
    let mut on_path: HashSet<*const Node> = HashSet::new();
    let mut done: HashSet<*const Node> = HashSet::new();
    if visit(root, &mut path, &mut on_path, &mut done) {
        path
    } else {
        Vec::new()
    }
}

fn visit(
    node: &Arc<Node>,
    path: &mut Vec<Arc<Node>>,
    on_path: &mut HashSet<*const Node>,
    done: &mut HashSet<*const Node>,
) -> bool {
    let ptr = Arc::as_ptr(node);
    if on_path.contains(&ptr) {
        return true;
    }
    if done.contains(&ptr) {
        return false;
    }
    path.push(node.clone());
    on_path.insert(ptr);
    for branch in node.branches() {
        if visit(&branch, path, on_path, done) {
            return true;
        }
    }
    path.pop();
    on_path.remove(&ptr);
    done.insert(ptr);
    false
}
