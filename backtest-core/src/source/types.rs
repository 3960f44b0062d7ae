// =================================================================
// source/types.rs - Data Structures
// =================================================================

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Parameters for querying a historical price range
#[derive(Debug, Clone)]
pub struct HistoricalPriceParams {
    /// Price-source native asset identifier (e.g. "bitcoin")
    pub coin_id: String,
    /// Quote currency
    pub vs_currency: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl HistoricalPriceParams {
    pub fn new(coin_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            coin_id: coin_id.into(),
            vs_currency: "usd".to_string(),
            start_time: start,
            end_time: end,
        }
    }

    pub fn with_vs_currency(mut self, vs_currency: impl Into<String>) -> Self {
        self.vs_currency = vs_currency.into().to_lowercase();
        self
    }

    /// Range start in epoch seconds, as the range endpoint expects
    pub fn from_secs(&self) -> i64 {
        self.start_time.timestamp()
    }

    /// Range end in epoch seconds
    pub fn to_secs(&self) -> i64 {
        self.end_time.timestamp()
    }
}

/// CoinGecko `market_chart/range` response body.
///
/// Each series is a list of `[timestamp_ms, value]` pairs. Points are kept
/// as raw JSON so a single malformed pair does not reject the whole body.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MarketChartResponse {
    #[serde(default)]
    pub prices: Vec<serde_json::Value>,

    #[serde(default)]
    pub total_volumes: Vec<serde_json::Value>,
}
