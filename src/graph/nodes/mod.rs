//! The six node variants making up the price graph

pub mod breaker;
pub mod indirect;
pub mod invert;
pub mod median;
pub mod origin;
pub mod reference;

pub use breaker::DeviationBreakerNode;
pub use indirect::IndirectNode;
pub use invert::InvertNode;
pub use median::MedianNode;
pub use origin::OriginNode;
pub use reference::ReferenceNode;
