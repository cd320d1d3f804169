//! PriceGraph Library
//!
//! Price aggregation graph engine: a directed, cycle-checked computation
//! graph turning per-origin ticks into consensus prices, with staleness
//! windows, quorum medians, cross-rates, deviation circuit breakers, and
//! bounded-concurrency refresh of external origins.

pub mod graph;
pub mod types;

pub use graph::{Node, Origin, Provider, Tick, Updater};
pub use types::Pair;
