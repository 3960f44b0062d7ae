// =================================================================
// data/types.rs - Shared Data Model
// =================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// A single raw price observation from the price feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Observation time (epoch milliseconds)
    pub timestamp: i64,
    /// Quoted price
    pub price: f64,
    /// Traded volume attached to the observation, 0 when the feed has none
    #[serde(default)]
    pub volume: f64,
}

impl PriceSample {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self {
            timestamp,
            price,
            volume: 0.0,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

/// OHLCV aggregate over one fixed-width time bucket.
///
/// `open_time` is the bucket start, so `open_time % width == 0` for the
/// width the candle was built with. `low <= open, close <= high` holds for
/// every candle produced by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "BUY",
            TradeKind::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for TradeKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeKind::Buy),
            "SELL" => Ok(TradeKind::Sell),
            other => Err(DataError::Validation(format!(
                "Unknown trade kind '{}'",
                other
            ))),
        }
    }
}

/// One simulated fill in the trade ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub kind: TradeKind,
    pub price: f64,
    pub quantity: f64,
    /// Open time of the candle that triggered the fill (epoch milliseconds)
    pub timestamp: i64,
    /// Realized profit; always 0 for a BUY
    #[serde(default)]
    pub profit: f64,
}

impl Trade {
    pub fn buy(price: f64, quantity: f64, timestamp: i64) -> Self {
        Self {
            kind: TradeKind::Buy,
            price,
            quantity,
            timestamp,
            profit: 0.0,
        }
    }

    pub fn sell(price: f64, quantity: f64, timestamp: i64, profit: f64) -> Self {
        Self {
            kind: TradeKind::Sell,
            price,
            quantity,
            timestamp,
            profit,
        }
    }

    pub fn is_sell(&self) -> bool {
        self.kind == TradeKind::Sell
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Secondary statistics over the closing trades of a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub closed_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub avg_profit_per_trade: f64,
    pub largest_winning_trade: f64,
    pub largest_losing_trade: f64,
    pub profit_factor: f64,
    /// The ledger ends with a BUY that was never closed
    pub open_position: bool,
}

/// Outcome of a completed backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub total_profit: f64,
    /// Percentage of SELL trades with positive profit, in [0, 100]
    pub win_rate: f64,
    pub trade_count: usize,
    pub stats: TradeStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_constructors() {
        let buy = Trade::buy(85.0, 1.0, 1_000);
        assert_eq!(buy.kind, TradeKind::Buy);
        assert_eq!(buy.profit, 0.0);
        assert!(!buy.is_sell());

        let sell = Trade::sell(90.0, 1.0, 2_000, 5.0);
        assert!(sell.is_sell());
        assert_eq!(sell.profit, 5.0);
    }

    #[test]
    fn test_trade_kind_parsing() {
        assert_eq!("buy".parse::<TradeKind>().unwrap(), TradeKind::Buy);
        assert_eq!("SELL".parse::<TradeKind>().unwrap(), TradeKind::Sell);
        assert!("hold".parse::<TradeKind>().is_err());
        assert_eq!(TradeKind::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_trade_serialization() {
        let trade = Trade::sell(105.0, 1.0, 3_600_000, 5.0);
        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["kind"], "SELL");
        assert_eq!(json["timestamp"], 3_600_000);

        let parsed: Trade =
            serde_json::from_str(r#"{"kind":"BUY","price":10.0,"quantity":1.0,"timestamp":0}"#)
                .unwrap();
        assert_eq!(parsed.profit, 0.0);
    }

    #[test]
    fn test_sample_volume_defaults_to_zero() {
        let sample = PriceSample::new(0, 100.0);
        assert_eq!(sample.volume, 0.0);
        assert_eq!(sample.with_volume(2.5).volume, 2.5);
    }
}
