//! Invert node - reciprocal of a branch price
//!
//! Turns a BTC/USD branch into a USD/BTC price. Volume is re-denominated
//! into the new base currency: `volume / (1/price)`, numerically
//! `volume * price`.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use crate::graph::error::{FeedError, GraphError};
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::types::Pair;

/// Wraps exactly one branch whose pair is the inverse of the node's.
#[derive(Debug)]
pub struct InvertNode {
    pair: Pair,
    branch: RwLock<Option<Arc<Node>>>,
}

impl InvertNode {
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

    /// Wire the single branch; its pair must equal the inverse of the node's.
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
            if node.pair() != self.pair.invert() {
                return Err(GraphError::IncompatibleBranchPair {
                    node: self.pair.clone(),
                    branch: node.pair(),
                });
            }
            *slot = Some(node.clone());
        }
        Ok(())
    }

    pub fn tick(&self) -> Tick {
        let branch = self
            .branch
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let node = match branch {
            None => {
                return Tick::from_error(
                    self.pair.clone(),
                    FeedError::MissingBranch(self.pair.clone()),
                )
            }
            Some(node) => node,
        };

        let tick = node.tick();
        if let Err(err) = tick.validate() {
            return Tick {
                pair: self.pair.clone(),
                time: tick.time,
                ..Tick::default()
            }
            .with_error(err);
        }

        let price = tick
            .price
            .and_then(|p| Decimal::ONE.checked_div(p))
            .unwrap_or_default();
        let volume24h = tick
            .volume24h
            .map(|v| v.checked_div(price).unwrap_or_default());

        Tick {
            pair: self.pair.clone(),
            price: Some(price),
            volume24h,
            time: tick.time,
            meta: tick.meta,
            warning: tick.warning,
            error: None,
        }
    }
}
