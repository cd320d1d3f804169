//! Tick - a point-in-time price observation
//!
//! Ticks are the values flowing through the graph: produced by origins,
//! transformed and combined by intermediate nodes, and finally handed to the
//! provider's callers. A tick is plain data; fatality is decided by
//! [`Tick::validate`], never by panics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::graph::error::FeedError;
use crate::types::Pair;

/// A priced observation for a pair at a point in time.
///
/// `warning` carries advisory provenance (a stale sibling source, one bad
/// branch among several) and never affects validity. `error` marks the tick
/// unusable; consumers must check [`validate`](Tick::validate) rather than
/// `price.is_some()`, because some nodes intentionally return error ticks
/// with numeric fields populated.
#[derive(Debug, Clone, Default)]
pub struct Tick {
    pub pair: Pair,
    pub price: Option<Decimal>,
    pub volume24h: Option<Decimal>,
    /// Observation time; the epoch default means "never set".
    pub time: DateTime<Utc>,
    /// Opaque structured annotation recording where the tick came from.
    pub meta: Value,
    pub warning: Option<FeedError>,
    pub error: Option<FeedError>,
}

impl Tick {
    /// A priced tick with no volume, warnings, or errors.
    pub fn new(pair: Pair, price: Decimal, time: DateTime<Utc>) -> Self {
        Self {
            pair,
            price: Some(price),
            time,
            ..Self::default()
        }
    }

    /// An unusable tick carrying only a pair and a fatal error.
    pub fn from_error(pair: Pair, error: FeedError) -> Self {
        Self {
            pair,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Attach a fatal error, keeping any numeric fields already set.
    pub fn with_error(mut self, error: FeedError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attach an advisory warning.
    pub fn with_warning(mut self, warning: FeedError) -> Self {
        self.warning = Some(warning);
        self
    }

    /// Set the 24h volume.
    pub fn with_volume24h(mut self, volume: Decimal) -> Self {
        self.volume24h = Some(volume);
        self
    }

    /// Whether this tick is usable as a price.
    ///
    /// An existing `error` is returned as-is; otherwise the pair must be
    /// complete, the price present and strictly positive, the time set, and
    /// the volume (if any) non-negative. `Decimal` is always finite, so no
    /// separate finiteness check is needed.
    pub fn validate(&self) -> Result<(), FeedError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if !self.pair.is_valid() {
            return Err(FeedError::IncompletePair(self.pair.clone()));
        }
        match self.price {
            None => return Err(FeedError::MissingPrice(self.pair.clone())),
            Some(price) if price <= Decimal::ZERO => {
                return Err(FeedError::NonPositivePrice {
                    pair: self.pair.clone(),
                    price,
                });
            }
            Some(_) => {}
        }
        if self.time == DateTime::<Utc>::UNIX_EPOCH {
            return Err(FeedError::MissingTime(self.pair.clone()));
        }
        if let Some(volume) = self.volume24h {
            if volume < Decimal::ZERO {
                return Err(FeedError::NegativeVolume {
                    pair: self.pair.clone(),
                    volume,
                });
            }
        }
        Ok(())
    }
}
