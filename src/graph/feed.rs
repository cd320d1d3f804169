//! Origin contract - the boundary to external price sources
//!
//! Implementations live outside this crate (HTTP adapters, exchange
//! clients); the graph only ever consumes them through this trait. The
//! updater matches returned ticks back to requests solely by pair, so the
//! returned list need not match `pairs` in length, order, or completeness.
//! A tick with its error slot set is a legal per-pair failure that does not
//! abort the whole call.

use async_trait::async_trait;

use crate::graph::tick::Tick;
use crate::types::Pair;

/// An external price source fetched by pairs.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch the latest ticks for the requested pairs.
    ///
    /// Cancellation is cooperative: dropping the future (e.g. when the
    /// caller's update round is cancelled) must leave no shared state
    /// behind, which this contract guarantees by returning plain values.
    async fn fetch_ticks(&self, pairs: &[Pair]) -> Vec<Tick>;
}
