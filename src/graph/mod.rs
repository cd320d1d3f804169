//! Price aggregation graph
//!
//! Turns raw per-origin price observations into a consensus price for a
//! named pair. Origin leaves hold mutable ticks refreshed by the
//! [`Updater`]; every other node is a pure function of its branches,
//! recomputed on each [`Node::tick`] call. Graphs are wired once via
//! `add_branch`, checked with [`detect_cycle`], then used read-mostly for
//! the process lifetime.

pub mod error;
pub mod feed;
pub mod node;
pub mod nodes;
pub mod provider;
pub mod tick;
pub mod updater;
pub mod walk;

pub use error::{FeedError, GraphError, ProviderError, UpdateError};
pub use feed::Origin;
pub use node::Node;
pub use nodes::{
    DeviationBreakerNode, IndirectNode, InvertNode, MedianNode, OriginNode, ReferenceNode,
};
pub use provider::{Model, Provider};
pub use tick::Tick;
pub use updater::{Updater, MAX_CONCURRENT_UPDATES};
pub use walk::{detect_cycle, walk};
