// backtest-core/src/backtest/engine.rs

use super::aggregator::{aggregate, Interval};
use super::metrics::summarize;
use super::strategy::{StrategyConfig, StrategyEngine};
use backtest_common::data::types::{BacktestResult, PriceSample};
use thiserror::Error;
use tracing::info;

/// Outcomes of the pure pipeline that carry no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Not enough data to run the backtest")]
    InsufficientData,

    #[error("The strategy found no trading opportunities")]
    NoOpportunities,
}

/// Samples -> candles -> trades -> statistics, with no I/O
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: StrategyConfig,
}

impl BacktestEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn run(
        &self,
        samples: Vec<PriceSample>,
        interval: Interval,
    ) -> Result<BacktestResult, EngineError> {
        let sample_count = samples.len();
        let candles = aggregate(samples, interval.bucket_width_ms());
        if candles.is_empty() {
            return Err(EngineError::InsufficientData);
        }

        info!(
            "Resampled {} samples into {} {} candles",
            sample_count,
            candles.len(),
            interval
        );

        let mut strategy = StrategyEngine::new(self.config);
        let trades = strategy.run(&candles);

        let result = summarize(trades).ok_or(EngineError::NoOpportunities)?;
        info!(
            "Backtest completed: {} trades, total profit {:.2}, win rate {:.2}%",
            result.trade_count, result.total_profit, result.win_rate
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;

    #[test]
    fn test_empty_samples_are_insufficient() {
        let engine = BacktestEngine::default();
        assert_eq!(
            engine.run(Vec::new(), Interval::OneHour),
            Err(EngineError::InsufficientData)
        );
    }

    #[test]
    fn test_flat_market_has_no_opportunities() {
        let samples = (0..48).map(|i| PriceSample::new(i * HOUR, 100.0)).collect();
        let engine = BacktestEngine::default();
        assert_eq!(
            engine.run(samples, Interval::OneHour),
            Err(EngineError::NoOpportunities)
        );
    }

    #[test]
    fn test_single_candle_buy() {
        let samples = vec![
            PriceSample::new(0, 100.0),
            PriceSample::new(1000, 90.0),
            PriceSample::new(2000, 85.0),
        ];
        let result = BacktestEngine::default()
            .run(samples, Interval::OneDay)
            .unwrap();

        assert_eq!(result.trade_count, 1);
        assert_eq!(result.trades[0].price, 85.0);
        assert_eq!(result.total_profit, 0.0);
        assert!(result.stats.open_position);
    }

    #[test]
    fn test_resampling_changes_granularity() {
        // hourly dip that disappears inside a daily candle's close
        let prices = [100.0, 90.0, 95.0, 100.0];
        let samples: Vec<PriceSample> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceSample::new(i as i64 * HOUR, p))
            .collect();

        let hourly = BacktestEngine::default()
            .run(samples.clone(), Interval::OneHour)
            .unwrap();
        assert_eq!(hourly.trade_count, 2);
        assert!((hourly.total_profit - 5.0).abs() < 1e-9);
        assert_eq!(hourly.win_rate, 100.0);

        assert_eq!(
            BacktestEngine::default().run(samples, Interval::OneDay),
            Err(EngineError::NoOpportunities)
        );
    }
}
