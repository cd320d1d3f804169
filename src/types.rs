//! Core types used throughout the price graph
//!
//! Defines the asset pair identifier carried by every tick and node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An asset pair such as `BTC/USD`.
///
/// Symbols are stored upper-cased. A pair is only considered valid when both
/// sides are non-empty; see [`Pair::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

/// Failed to parse a `BASE/QUOTE` string into a [`Pair`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse pair: {0:?}")]
pub struct ParsePairError(pub String);

impl Pair {
    /// Create a pair, upper-casing both symbols.
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    /// The reciprocal pair: `BTC/USD` becomes `USD/BTC`.
    pub fn invert(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// True when both base and quote are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.base.is_empty() && !self.quote.is_empty()
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = ParsePairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Pair::new(base, quote))
            }
            _ => Err(ParsePairError(s.to_string())),
        }
    }
}
