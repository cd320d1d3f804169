//! Indirect node - chained cross-rates
//!
//! Derives a price for A/C from known prices for A/B and B/C (or any of the
//! four base/quote overlaps), folding an ordered list of branches
//! left-to-right. The combined time is always the earliest of the ticks
//! involved, so the result is never newer than its stalest input.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use crate::graph::error::{FeedError, GraphError};
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::types::Pair;

/// Wraps an ordered sequence of branches combined into one cross-rate.
#[derive(Debug)]
pub struct IndirectNode {
    pair: Pair,
    branches: RwLock<Vec<Arc<Node>>>,
}

impl IndirectNode {
    pub fn new(pair: Pair) -> Self {
        Self {
            pair,
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

    /// Branch order is significant; pair compatibility is checked when the
    /// chain is evaluated, not at wiring time.
    pub fn add_branch(&self, branches: &[Arc<Node>]) -> Result<(), GraphError> {
        self.branches
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(branches.iter().cloned());
        Ok(())
    }

    pub fn tick(&self) -> Tick {
        let branches = self.branches();
        if branches.is_empty() {
            return Tick::from_error(
                self.pair.clone(),
                FeedError::MissingBranch(self.pair.clone()),
            );
        }

        let ticks: Vec<Tick> = branches.iter().map(|node| node.tick()).collect();
        for tick in &ticks {
            if let Err(err) = tick.validate() {
                return Tick {
                    pair: self.pair.clone(),
                    time: tick.time,
                    ..Tick::default()
                }
                .with_error(err);
            }
        }

        let mut combined = ticks[0].clone();
        for tick in &ticks[1..] {
            combined = match cross_rate(&combined, tick) {
                Ok(tick) => tick,
                Err(err) => {
                    return Tick::from_error(self.pair.clone(), err);
                }
            };
        }

        if combined.pair != self.pair {
            return Tick::from_error(
                self.pair.clone(),
                FeedError::ResolvedPairMismatch {
                    expected: self.pair.clone(),
                    resolved: combined.pair,
                },
            );
        }
        combined
    }
}

/// Combine two adjacent resolved ticks into one.
///
/// Exactly one of the four base/quote overlaps must hold; a zero divisor
/// yields a zero price rather than an arithmetic failure, which downstream
/// validation then rejects.
fn cross_rate(a: &Tick, b: &Tick) -> Result<Tick, FeedError> {
    let a_price = a.price.unwrap_or_default();
    let b_price = b.price.unwrap_or_default();

    let (pair, price) = if a.pair.quote == b.pair.quote {
        (
            Pair::new(&a.pair.base, &b.pair.base),
            a_price.checked_div(b_price).unwrap_or_default(),
        )
    } else if a.pair.base == b.pair.base {
        (
            Pair::new(&a.pair.quote, &b.pair.quote),
            b_price.checked_div(a_price).unwrap_or_default(),
        )
    } else if a.pair.quote == b.pair.base {
        (
            Pair::new(&a.pair.base, &b.pair.quote),
            a_price.checked_mul(b_price).unwrap_or_default(),
        )
    } else if a.pair.base == b.pair.quote {
        (
            Pair::new(&a.pair.quote, &b.pair.base),
            a_price
                .checked_mul(b_price)
                .and_then(|product| Decimal::ONE.checked_div(product))
                .unwrap_or_default(),
        )
    } else {
        return Err(FeedError::IncompatiblePairs(a.pair.clone(), b.pair.clone()));
    };

    Ok(Tick {
        pair,
        price: Some(price),
        volume24h: None,
        time: a.time.min(b.time),
        meta: serde_json::Value::Null,
        warning: None,
        error: None,
    })
}
