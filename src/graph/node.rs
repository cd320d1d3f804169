//! Node - the polymorphic graph vertex
//!
//! A closed sum over the six variants. Every variant answers the same
//! four-operation contract: its pair, its direct branches, branch wiring,
//! and an on-demand tick. Composition is explicit data (`Arc` branches),
//! not a class hierarchy; nothing here memoizes, so repeated `tick()` calls
//! recompute from whatever the origin leaves currently hold.

use std::sync::Arc;

use crate::graph::error::GraphError;
use crate::graph::nodes::{
    DeviationBreakerNode, IndirectNode, InvertNode, MedianNode, OriginNode, ReferenceNode,
};
use crate::graph::tick::Tick;
use crate::types::Pair;

/// A vertex in the price DAG.
#[derive(Debug)]
pub enum Node {
    Origin(OriginNode),
    Reference(ReferenceNode),
    Invert(InvertNode),
    Indirect(IndirectNode),
    Median(MedianNode),
    DeviationBreaker(DeviationBreakerNode),
}

impl Node {
    /// The pair this node resolves to.
    pub fn pair(&self) -> Pair {
        match self {
            Node::Origin(node) => node.pair(),
            Node::Reference(node) => node.pair(),
            Node::Invert(node) => node.pair(),
            Node::Indirect(node) => node.pair(),
            Node::Median(node) => node.pair(),
            Node::DeviationBreaker(node) => node.pair(),
        }
    }

    /// Direct children; empty for origin leaves.
    pub fn branches(&self) -> Vec<Arc<Node>> {
        match self {
            Node::Origin(_) => Vec::new(),
            Node::Reference(node) => node.branches(),
            Node::Invert(node) => node.branches(),
            Node::Indirect(node) => node.branches(),
            Node::Median(node) => node.branches(),
            Node::DeviationBreaker(node) => node.branches(),
        }
    }

    /// Wire children during graph assembly; each variant enforces its own
    /// arity and pair-compatibility rules.
    pub fn add_branch(&self, branches: &[Arc<Node>]) -> Result<(), GraphError> {
        match self {
            Node::Origin(node) => node.add_branch(branches),
            Node::Reference(node) => node.add_branch(branches),
            Node::Invert(node) => node.add_branch(branches),
            Node::Indirect(node) => node.add_branch(branches),
            Node::Median(node) => node.add_branch(branches),
            Node::DeviationBreaker(node) => node.add_branch(branches),
        }
    }

    /// Compute this node's tick, pulling branch ticks recursively.
    pub fn tick(&self) -> Tick {
        match self {
            Node::Origin(node) => node.tick(),
            Node::Reference(node) => node.tick(),
            Node::Invert(node) => node.tick(),
            Node::Indirect(node) => node.tick(),
            Node::Median(node) => node.tick(),
            Node::DeviationBreaker(node) => node.tick(),
        }
    }

    /// The origin leaf behind this node, if that is what it is.
    pub fn as_origin(&self) -> Option<&OriginNode> {
        match self {
            Node::Origin(node) => Some(node),
            _ => None,
        }
    }
}
