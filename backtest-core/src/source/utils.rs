// =================================================================
// source/utils.rs - Utility Functions
// =================================================================

use super::{MarketChartResponse, SourceError};
use backtest_common::data::types::PriceSample;
use std::collections::HashMap;
use tracing::warn;

/// Trading pairs the backtest accepts, with their CoinGecko asset ids
pub const SUPPORTED_SYMBOLS: &[(&str, &str)] = &[
    ("BTCUSDT", "bitcoin"),
    ("ETHUSDT", "ethereum"),
];

/// Map an external trading pair to the price source's asset id
pub fn map_symbol_to_coin_id(symbol: &str) -> Result<&'static str, SourceError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(SourceError::InvalidSymbol(
            "Symbol cannot be empty".to_string(),
        ));
    }

    SUPPORTED_SYMBOLS
        .iter()
        .find(|(pair, _)| *pair == symbol)
        .map(|(_, coin_id)| *coin_id)
        .ok_or_else(|| {
            SourceError::InvalidSymbol(format!("Symbol '{}' is not supported", symbol))
        })
}

/// Parse one `[timestamp_ms, value]` pair
pub fn parse_chart_point(point: &serde_json::Value) -> Result<(i64, f64), SourceError> {
    let pair = point
        .as_array()
        .filter(|p| p.len() >= 2)
        .ok_or_else(|| {
            SourceError::ParseError(format!("Expected [time, value] pair, got {}", point))
        })?;

    let timestamp = pair[0]
        .as_f64()
        .filter(|t| t.is_finite())
        .ok_or_else(|| SourceError::ParseError(format!("Invalid timestamp in {}", point)))?;

    let value = pair[1]
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| SourceError::ParseError(format!("Invalid value in {}", point)))?;

    Ok((timestamp as i64, value))
}

/// Convert a market chart body into price samples, attaching volumes by timestamp
pub fn convert_market_chart_to_samples(response: &MarketChartResponse) -> Vec<PriceSample> {
    let volumes: HashMap<i64, f64> = response
        .total_volumes
        .iter()
        .filter_map(|point| parse_chart_point(point).ok())
        .collect();

    let mut samples = Vec::with_capacity(response.prices.len());
    for point in &response.prices {
        match parse_chart_point(point) {
            Ok((timestamp, price)) => {
                let volume = volumes.get(&timestamp).copied().unwrap_or(0.0);
                samples.push(PriceSample::new(timestamp, price).with_volume(volume));
            }
            Err(e) => warn!("Skipping price point: {}", e),
        }
    }
    samples
}
