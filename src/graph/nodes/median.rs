//! Median node - quorum-gated statistical median across branches
//!
//! Pulls every branch tick, drops invalid or mismatched-pair ones into the
//! warning set, and takes the median of what survives. Fewer valid prices
//! than the quorum produce an error tick that still carries the collected
//! warnings and metadata for observability.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::graph::error::{FeedError, GraphError};
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::types::Pair;

/// Wraps `N` branches and a minimum-valid-sources quorum.
#[derive(Debug)]
pub struct MedianNode {
    pair: Pair,
    min_sources: usize,
    branches: RwLock<Vec<Arc<Node>>>,
}

impl MedianNode {
    pub fn new(pair: Pair, min_sources: usize) -> Self {
        Self {
            pair,
            min_sources,
            branches: RwLock::new(Vec::new()),
        }
    }

    pub fn pair(&self) -> Pair {
        self.pair.clone()
    }

    pub fn min_sources(&self) -> usize {
        self.min_sources
    }

    pub fn branches(&self) -> Vec<Arc<Node>> {
        self.branches
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Branches are screened at evaluation time, so any node is accepted
    /// here; a bad branch costs quorum, it does not break wiring.
    pub fn add_branch(&self, branches: &[Arc<Node>]) -> Result<(), GraphError> {
        self.branches
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(branches.iter().cloned());
        Ok(())
    }

    pub fn tick(&self) -> Tick {
        let branches = self.branches();

        let mut prices: Vec<Decimal> = Vec::with_capacity(branches.len());
        let mut warnings: Vec<FeedError> = Vec::new();
        // Earliest time across ALL branches, valid or not.
        let mut min_time: Option<DateTime<Utc>> = None;

        for node in &branches {
            let tick = node.tick();
            min_time = Some(match min_time {
                None => tick.time,
                Some(time) => time.min(tick.time),
            });

            if tick.pair != self.pair {
                warnings.push(FeedError::IncompatiblePair {
                    node: self.pair.clone(),
                    tick: tick.pair,
                });
                continue;
            }
            match tick.validate() {
                Err(err) => warnings.push(err),
                Ok(()) => {
                    if let Some(price) = tick.price {
                        prices.push(price);
                    }
                }
            }
        }

        let given = prices.len();
        let meta = json!({
            "aggregator": "median",
            "min_sources": self.min_sources,
            "valid_sources": given,
            "branches": branches.len(),
        });

        let mut tick = Tick {
            pair: self.pair.clone(),
            price: None,
            volume24h: None,
            time: min_time.unwrap_or_default(),
            meta,
            warning: FeedError::combined(warnings),
            error: None,
        };

        if given < self.min_sources {
            tick.error = Some(FeedError::NotEnoughSources {
                pair: self.pair.clone(),
                expected: self.min_sources,
                given,
            });
            return tick;
        }

        tick.price = median(&mut prices);
        tick
    }
}

/// Statistical median: sort ascending; odd count takes the middle element,
/// even count the arithmetic mean of the two central ones.
fn median(prices: &mut [Decimal]) -> Option<Decimal> {
    if prices.is_empty() {
        return None;
    }
    prices.sort();
    let mid = prices.len() / 2;
    if prices.len() % 2 == 1 {
        Some(prices[mid])
    } else {
        prices[mid - 1]
            .checked_add(prices[mid])
            .and_then(|sum| sum.checked_div(Decimal::TWO))
    }
}
