//! Deviation circuit breaker - invalidates prices that drift from a reference
//!
//! Two branches: the price being gated and a reference price, both carrying
//! the node's pair. When `|1 - reference/price|` exceeds the threshold the
//! returned tick keeps its numeric fields but is marked with a fatal error,
//! so consumers that only check `price.is_some()` would be misled; they must
//! call `validate()`.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use crate::graph::error::{FeedError, GraphError};
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::types::Pair;

/// Gates the first branch's price against the second branch's reference.
#[derive(Debug)]
pub struct DeviationBreakerNode {
    pair: Pair,
    threshold: Decimal,
    branches: RwLock<Vec<Arc<Node>>>,
}

impl DeviationBreakerNode {
    pub fn new(pair: Pair, threshold: Decimal) -> Self {
        Self {
            pair,
            threshold,
            branches: RwLock::new(Vec::new()),
        }
    }

    pub fn pair(&self) -> Pair {
        self.pair.clone()
    }

    pub fn branches(&self) -> Vec<Arc<Node>> {
        self.branches
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// First branch is the price, second the reference; both must carry the
    /// node's pair and a third branch is an error.
    pub fn add_branch(&self, branches: &[Arc<Node>]) -> Result<(), GraphError> {
        let mut wired = self
            .branches
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for node in branches {
            if wired.len() >= 2 {
                return Err(GraphError::TooManyBranches {
                    node: self.pair.clone(),
                    max: 2,
                });
            }
            if node.pair() != self.pair {
                return Err(GraphError::IncompatibleBranchPair {
                    node: self.pair.clone(),
                    branch: node.pair(),
                });
            }
            wired.push(node.clone());
        }
        Ok(())
    }

    pub fn tick(&self) -> Tick {
        let branches = self.branches();
        let (price_node, reference_node) = match (branches.first(), branches.get(1)) {
            (Some(price), Some(reference)) => (price, reference),
            _ => {
                return Tick::from_error(
                    self.pair.clone(),
                    FeedError::MissingBranch(self.pair.clone()),
                )
            }
        };

        let price_tick = price_node.tick();
        if let Err(err) = price_tick.validate() {
            return Tick {
                pair: self.pair.clone(),
                time: price_tick.time,
                ..Tick::default()
            }
            .with_error(err);
        }
        let reference_tick = reference_node.tick();
        if let Err(err) = reference_tick.validate() {
            return Tick {
                pair: self.pair.clone(),
                time: reference_tick.time,
                ..Tick::default()
            }
            .with_error(err);
        }

        let price = price_tick.price.unwrap_or_default();
        let reference = reference_tick.price.unwrap_or_default();
        let deviation = reference
            .checked_div(price)
            .map(|ratio| (Decimal::ONE - ratio).abs())
            .unwrap_or_default();

        if deviation > self.threshold {
            return price_tick.with_error(FeedError::DeviationExceeded {
                pair: self.pair.clone(),
                deviation,
                threshold: self.threshold,
            });
        }
        price_tick
    }
}
