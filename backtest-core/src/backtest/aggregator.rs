// backtest-core/src/backtest/aggregator.rs

use backtest_common::data::types::{Candle, PriceSample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Resampling interval accepted by the backtest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported interval '{0}', expected one of 1h, 4h, 1d")]
pub struct InvalidInterval(pub String);

impl Interval {
    pub const ALL: [Interval; 3] = [Interval::OneHour, Interval::FourHours, Interval::OneDay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        }
    }

    /// Bucket width in milliseconds
    pub fn bucket_width_ms(&self) -> i64 {
        match self {
            Interval::OneHour => HOUR_MS,
            Interval::FourHours => 4 * HOUR_MS,
            Interval::OneDay => 24 * HOUR_MS,
        }
    }
}

impl FromStr for Interval {
    type Err = InvalidInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Interval::OneHour),
            "4h" => Ok(Interval::FourHours),
            "1d" => Ok(Interval::OneDay),
            other => Err(InvalidInterval(other.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group raw samples into OHLCV candles of `bucket_width_ms`.
///
/// Samples are stably sorted by timestamp first, so input order does not
/// matter. Buckets are `timestamp.div_euclid(bucket_width_ms)`; empty buckets
/// produce no candle.
pub fn aggregate(mut samples: Vec<PriceSample>, bucket_width_ms: i64) -> Vec<Candle> {
    if bucket_width_ms <= 0 {
        warn!("Refusing to aggregate with bucket width {}ms", bucket_width_ms);
        return Vec::new();
    }

    samples.sort_by_key(|s| s.timestamp);

    let mut candles: Vec<Candle> = Vec::new();
    let mut current_bucket: Option<i64> = None;

    for sample in &samples {
        let bucket = sample.timestamp.div_euclid(bucket_width_ms);

        if current_bucket == Some(bucket) {
            if let Some(candle) = candles.last_mut() {
                candle.high = candle.high.max(sample.price);
                candle.low = candle.low.min(sample.price);
                candle.close = sample.price;
                candle.volume += sample.volume;
                continue;
            }
        }

        candles.push(Candle {
            open_time: bucket * bucket_width_ms,
            open: sample.price,
            high: sample.price,
            low: sample.price,
            close: sample.price,
            volume: sample.volume,
        });
        current_bucket = Some(bucket);
    }

    debug!(
        "Aggregated {} samples into {} candles ({}ms buckets)",
        samples.len(),
        candles.len(),
        bucket_width_ms
    );
    candles
}
