//! Reference node - a named alias onto a shared sub-DAG
//!
//! Lets several models point at the same subgraph without duplicating it.
//! The tick passes through untouched except that its meta is wrapped to
//! record the indirection.

use std::sync::{Arc, RwLock};

use serde_json::json;

use crate::graph::error::{FeedError, GraphError};
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::types::Pair;

/// Wraps exactly one branch of the same pair.
#[derive(Debug)]
pub struct ReferenceNode {
    pair: Pair,
    branch: RwLock<Option<Arc<Node>>>,
}

impl ReferenceNode {
    pub fn new(pair: Pair) -> Self {
        Self {
            pair,
            branch: RwLock::new(None),
        }
    }

    pub fn pair(&self) -> Pair {
        self.pair.clone()
    }

    pub fn branches(&self) -> Vec<Arc<Node>> {
        self.branch
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Wire the single branch; it must carry the node's pair, and a second
    /// call errors.
    pub fn add_branch(&self, branches: &[Arc<Node>]) -> Result<(), GraphError> {
        let mut slot = self
            .branch
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for node in branches {
            if slot.is_some() {
                return Err(GraphError::TooManyBranches {
                    node: self.pair.clone(),
                    max: 1,
                });
            }
            if node.pair() != self.pair {
                return Err(GraphError::IncompatibleBranchPair {
                    node: self.pair.clone(),
                    branch: node.pair(),
                });
            }
            *slot = Some(node.clone());
        }
        Ok(())
    }

    /// Forward the branch tick, wrapping its meta to record the reference.
    pub fn tick(&self) -> Tick {
        let branch = self
            .branch
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match branch {
            None => Tick::from_error(self.pair.clone(), FeedError::MissingBranch(self.pair.clone())),
            Some(node) => {
                let mut tick = node.tick();
                tick.meta = json!({ "reference": tick.meta });
                tick
            }
        }
    }
}
