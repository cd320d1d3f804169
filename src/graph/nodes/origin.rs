//! Origin node - the mutable leaf holding one origin's latest tick
//!
//! The only node kind with externally mutable state. The updater writes
//! fresh ticks in via `set_tick`; everything else in the graph only reads
//! snapshots. Two time windows govern the held tick: within
//! `fresh_for` no refetch is needed, and past `expires_after` the tick is
//! too old to use at all.

use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use serde_json::json;

use crate::graph::error::{FeedError, GraphError};
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::types::Pair;

/// Leaf node bound to one `(origin name, pair)`.
#[derive(Debug)]
pub struct OriginNode {
    origin: String,
    pair: Pair,
    /// Held ticks younger than this need no refetch.
    fresh_for: Duration,
    /// Held ticks older than this are unusable.
    expires_after: Duration,
    tick: RwLock<Tick>,
}

impl OriginNode {
    /// A new origin node holding an empty (never-set) tick, which is neither
    /// fresh nor usable until the first successful `set_tick`.
    pub fn new(origin: &str, pair: Pair, fresh_for: Duration, expires_after: Duration) -> Self {
        let tick = Tick {
            pair: pair.clone(),
            ..Tick::default()
        };
        Self {
            origin: origin.to_string(),
            pair,
            fresh_for,
            expires_after,
            tick: RwLock::new(tick),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn pair(&self) -> Pair {
        self.pair.clone()
    }

    /// Origin nodes are leaves; any branch is a wiring mistake.
    pub fn add_branch(&self, branches: &[Arc<Node>]) -> Result<(), GraphError> {
        if branches.is_empty() {
            Ok(())
        } else {
            Err(GraphError::OriginHasNoBranches(self.pair.clone()))
        }
    }

    /// Snapshot of the held tick.
    ///
    /// A held error passes through unchanged. Otherwise, if the tick has
    /// expired, the snapshot (not the stored tick) gets an expiry error.
    pub fn tick(&self) -> Tick {
        let held = self
            .tick
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if held.error.is_some() {
            return held;
        }
        if self.is_expired() {
            return held.with_error(FeedError::TickExpired {
                origin: self.origin.clone(),
                pair: self.pair.clone(),
            });
        }
        held
    }

    /// Store a freshly fetched tick.
    ///
    /// Rejects pair mismatches, ticks failing validation, and ticks strictly
    /// older than the held one; the held tick is untouched on rejection.
    /// Out-of-order updates are dropped, not merged. On success the tick's
    /// meta is overwritten with this node's origin name.
    pub fn set_tick(&self, mut tick: Tick) -> Result<(), FeedError> {
        if tick.pair != self.pair {
            return Err(FeedError::IncompatiblePair {
                node: self.pair.clone(),
                tick: tick.pair,
            });
        }
        if let Err(err) = tick.validate() {
            return Err(FeedError::InvalidTick(Box::new(err)));
        }
        let mut held = self
            .tick
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if tick.time < held.time {
            return Err(FeedError::TickTooOld(self.pair.clone()));
        }
        tick.meta = json!({ "origin": self.origin });
        *held = tick;
        Ok(())
    }

    /// Record an advisory issue (e.g. no data in the last fetch round)
    /// without invalidating the held tick.
    pub fn set_warning(&self, warning: FeedError) {
        let mut held = self
            .tick
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        held.warning = Some(warning);
    }

    /// True when the held tick is young enough that no refetch is needed.
    pub fn is_fresh(&self) -> bool {
        let time = self
            .tick
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .time;
        time.checked_add_signed(self.fresh_for)
            .map(|deadline| deadline > Utc::now())
            .unwrap_or(false)
    }

    /// True once `expires_after` has elapsed since the held tick's time.
    pub fn is_expired(&self) -> bool {
        let time = self
            .tick
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .time;
        time.checked_add_signed(self.expires_after)
            .map(|deadline| deadline < Utc::now())
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn node(fresh_secs: i64, expiry_secs: i64) -> OriginNode {
        OriginNode::new(
            "binance",
            Pair::new("BTC", "USD"),
            Duration::seconds(fresh_secs),
            Duration::seconds(expiry_secs),
        )
    }

    fn tick_at(age_secs: i64, price: rust_decimal::Decimal) -> Tick {
        Tick::new(
            Pair::new("BTC", "USD"),
            price,
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    #[test]
    fn test_empty_node_is_neither_fresh_nor_usable() {
        let node = node(60, 300);
        assert!(!node.is_fresh());
        assert!(node.is_expired());
        assert!(node.tick().validate().is_err());
    }

    #[test]
    fn test_set_tick_stores_and_stamps_meta() {
        let node = node(60, 300);
        node.set_tick(tick_at(1, dec!(20000))).unwrap();

        let held = node.tick();
        assert!(held.validate().is_ok());
        assert_eq!(held.price, Some(dec!(20000)));
        assert_eq!(held.meta, serde_json::json!({ "origin": "binance" }));
        assert!(node.is_fresh());
    }

    #[test]
    fn test_set_tick_rejects_incompatible_pair() {
        let node = node(60, 300);
        let tick = Tick::new(Pair::new("ETH", "USD"), dec!(3000), Utc::now());
        assert!(matches!(
            node.set_tick(tick),
            Err(FeedError::IncompatiblePair { .. })
        ));
    }

    #[test]
    fn test_set_tick_rejects_invalid_tick() {
        let node = node(60, 300);
        let tick = Tick::new(Pair::new("BTC", "USD"), dec!(-1), Utc::now());
        assert!(matches!(
            node.set_tick(tick),
            Err(FeedError::InvalidTick(_))
        ));
    }

    #[test]
    fn test_set_tick_rejects_older_tick_keeping_held() {
        let node = node(60, 300);
        node.set_tick(tick_at(10, dec!(20000))).unwrap();
        assert!(matches!(
            node.set_tick(tick_at(20, dec!(19000))),
            Err(FeedError::TickTooOld(_))
        ));
        assert_eq!(node.tick().price, Some(dec!(20000)));
    }

    #[test]
    fn test_freshness_window() {
        let node = node(60, 300);
        node.set_tick(tick_at(90, dec!(20000))).unwrap();
        assert!(!node.is_fresh());
        assert!(!node.is_expired());
        assert!(node.tick().validate().is_ok());
    }

    // Pins the expiry direction: a tick is expired once `expires_after` has
    // elapsed since its time, never because it is timestamped in the future.
    #[test]
    fn test_expiry_window_direction() {
        let node = node(60, 300);
        node.set_tick(tick_at(600, dec!(20000))).unwrap();
        assert!(node.is_expired());

        let returned = node.tick();
        assert!(matches!(
            returned.validate(),
            Err(FeedError::TickExpired { .. })
        ));
        // The stored tick stays untouched; only the snapshot carries the error.
        assert!(matches!(
            node.set_tick(tick_at(1, dec!(21000))),
            Ok(())
        ));
        assert!(node.tick().validate().is_ok());
    }

    #[test]
    fn test_set_warning_keeps_tick_valid() {
        let node = node(60, 300);
        node.set_tick(tick_at(1, dec!(20000))).unwrap();
        node.set_warning(FeedError::MissingTick {
            origin: "binance".to_string(),
            pair: Pair::new("BTC", "USD"),
        });

        let held = node.tick();
        assert!(held.warning.is_some());
        assert!(held.validate().is_ok());
    }
}
