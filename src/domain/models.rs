//! Core value types shared by every layer of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price observation from an exchange feed.
///
/// Immutable after construction: a source produces it, a worker writes a
/// copy into the cache and another into the aggregator's buffer, and it is
/// dropped once the owning window flushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub exchange: String,
    pub pair: String,
    pub price: f64,
    pub time: DateTime<Utc>,
}

/// Window statistics for one (exchange, pair) bucket, computed at flush time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub exchange: String,
    pub pair: String,
    /// The window-close instant, not the timestamp of any individual update.
    pub timestamp: DateTime<Utc>,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceStats {
    /// Build stats from a non-empty slice of prices observed in one window.
    ///
    /// `min`/`max` seed from the first price (never from 0 or +/-infinity),
    /// matching the numeric semantics required of every flush.
    pub fn from_prices(exchange: String, pair: String, timestamp: DateTime<Utc>, prices: &[f64]) -> Self {
        debug_assert!(!prices.is_empty());
        let mut min = prices[0];
        let mut max = prices[0];
        let mut sum = 0.0f64;
        for &p in prices {
            sum += p;
            if p < min {
                min = p;
            }
            if p > max {
                max = p;
            }
        }
        let average = sum / prices.len() as f64;
        Self {
            exchange,
            pair,
            timestamp,
            average,
            min,
            max,
        }
    }
}
