//! Error types for graph wiring, tick evaluation, and the provider facade
//!
//! Three layers, matching how failures travel through the system:
//! - [`FeedError`] rides inside a tick (fatal in `error`, advisory in
//!   `warning`) and propagates through aggregating nodes.
//! - [`GraphError`] is returned immediately from `add_branch` during graph
//!   assembly.
//! - [`ProviderError`] / [`UpdateError`] surface at the facade boundary.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::Pair;

fn join_errors(errors: &[FeedError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A condition attached to a tick, either fatal (`Tick::error`) or advisory
/// (`Tick::warning`). Cloneable so ticks stay plain data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    /// Tick pair has an empty base or quote.
    #[error("tick pair is incomplete: {0:?}")]
    IncompletePair(Pair),

    /// Tick carries no price.
    #[error("tick for {0} has no price")]
    MissingPrice(Pair),

    /// Tick price is zero or negative.
    #[error("tick price for {pair} must be positive, got {price}")]
    NonPositivePrice { pair: Pair, price: Decimal },

    /// Tick timestamp was never set.
    #[error("tick for {0} has no timestamp")]
    MissingTime(Pair),

    /// Tick 24h volume is negative.
    #[error("tick volume for {pair} must not be negative, got {volume}")]
    NegativeVolume { pair: Pair, volume: Decimal },

    /// A tick offered to an origin node names a different pair.
    #[error("tick pair {tick} is incompatible with origin pair {node}")]
    IncompatiblePair { node: Pair, tick: Pair },

    /// A tick offered to an origin node failed validation.
    #[error("invalid tick: {0}")]
    InvalidTick(Box<FeedError>),

    /// A tick offered to an origin node is older than the one held.
    #[error("tick for {0} is older than the tick currently held")]
    TickTooOld(Pair),

    /// The origin node's held tick is past its expiry threshold.
    #[error("tick for {pair} from {origin} has expired")]
    TickExpired { origin: String, pair: Pair },

    /// A fetch round produced no tick for this origin and pair.
    #[error("origin {origin} returned no tick for {pair}")]
    MissingTick { origin: String, pair: Pair },

    /// No registered origin under this name.
    #[error("unknown origin: {0}")]
    UnknownOrigin(String),

    /// A fetch task panicked; converted into per-pair error ticks.
    #[error("fetch from origin {origin} panicked: {message}")]
    FetchPanic { origin: String, message: String },

    /// Two adjacent ticks in an indirect chain share no common symbol.
    #[error("unable to calculate cross rate between {0} and {1}")]
    IncompatiblePairs(Pair, Pair),

    /// An indirect chain resolved to a pair other than the node's.
    #[error("cross rate resolved to {resolved}, expected {expected}")]
    ResolvedPairMismatch { expected: Pair, resolved: Pair },

    /// A median node fell short of its quorum of valid branch prices.
    #[error("not enough sources to calculate median for {pair}: {given} given, {expected} required")]
    NotEnoughSources {
        pair: Pair,
        expected: usize,
        given: usize,
    },

    /// A circuit breaker tripped: price deviates too far from reference.
    #[error("price for {pair} deviates from reference by {deviation}, above threshold {threshold}")]
    DeviationExceeded {
        pair: Pair,
        deviation: Decimal,
        threshold: Decimal,
    },

    /// A node was evaluated before its branches were wired.
    #[error("node for {0} has no branch wired")]
    MissingBranch(Pair),

    /// Several advisory conditions collected by one aggregating node.
    #[error("{}", join_errors(.0))]
    Combined(Vec<FeedError>),
}

impl FeedError {
    /// Fold a list of warnings into at most one error value.
    pub fn combined(mut warnings: Vec<FeedError>) -> Option<FeedError> {
        match warnings.len() {
            0 => None,
            1 => Some(warnings.remove(0)),
            _ => Some(FeedError::Combined(warnings)),
        }
    }
}

/// Structural error raised while wiring branches into a node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Origin nodes are leaves.
    #[error("origin node for {0} accepts no branches")]
    OriginHasNoBranches(Pair),

    /// The node's branch arity is fixed and already satisfied.
    #[error("node for {node} accepts at most {max} branch(es)")]
    TooManyBranches { node: Pair, max: usize },

    /// The branch pair does not satisfy the node's pair constraint.
    #[error("branch pair {branch} is incompatible with node pair {node}")]
    IncompatibleBranchPair { node: Pair, branch: Pair },
}

/// Error returned by [`Updater::update`](crate::graph::updater::Updater::update).
///
/// Per-origin fetch failures never surface here; they are demoted to per-node
/// warnings. Only task-join plumbing failures reach the caller.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("fetch task failed to join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Error returned by the [`Provider`](crate::graph::provider::Provider) facade.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("price model not found: {0}")]
    ModelNotFound(String),

    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    #[error(transparent)]
    Update(#[from] UpdateError),
}
