use std::sync::Arc;
use std::time::Duration;

use backtest_common::data::repository::TradeSink;
use backtest_common::data::types::BacktestResult;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::{BacktestError, RateGuard};
use crate::backtest::{BacktestEngine, Interval, StrategyConfig};
use crate::source::{map_symbol_to_coin_id, HistoricalPriceParams, PriceSource, SUPPORTED_SYMBOLS};

/// Default length of the price history fed into a run
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Longest price history a run may request
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Backtest orchestrator that coordinates the price source, the pure
/// pipeline and trade persistence
pub struct BacktestService {
    /// Historical price feed
    source: Arc<dyn PriceSource>,
    /// Append-only trade destination
    sink: Arc<dyn TradeSink>,
    /// Pure aggregation/strategy/summary pipeline
    engine: BacktestEngine,
    /// Minimum spacing between runs
    rate_guard: RateGuard,
    /// Length of the trailing price window in days
    lookback_days: i64,
    /// Quote currency requested from the source
    vs_currency: String,
}

impl BacktestService {
    /// Create a new backtest service
    pub fn new(
        source: Arc<dyn PriceSource>,
        sink: Arc<dyn TradeSink>,
        strategy: StrategyConfig,
    ) -> Self {
        Self {
            source,
            sink,
            engine: BacktestEngine::new(strategy),
            rate_guard: RateGuard::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            vs_currency: "usd".to_string(),
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.rate_guard = RateGuard::new(min_interval);
        self
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_vs_currency(mut self, vs_currency: impl Into<String>) -> Self {
        self.vs_currency = vs_currency.into();
        self
    }

    pub fn supported_symbols() -> Vec<&'static str> {
        SUPPORTED_SYMBOLS.iter().map(|(pair, _)| *pair).collect()
    }

    /// Start of the trailing window ending at `now`
    fn window_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, BacktestError> {
        if self.lookback_days <= 0 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(BacktestError::InvalidWindow(format!(
                "lookback of {} days is outside 1..={}",
                self.lookback_days, MAX_LOOKBACK_DAYS
            )));
        }

        chrono::Duration::try_days(self.lookback_days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .ok_or_else(|| {
                BacktestError::InvalidWindow(format!(
                    "{} days before {} is out of range",
                    self.lookback_days, now
                ))
            })
    }

    /// Allow the next run immediately, e.g. after the caller waited out a cooldown
    pub fn clear_rate_limit(&self) {
        debug!("Rate limit cleared");
        self.rate_guard.reset();
    }

    /// Run a backtest for `symbol` resampled at `interval`, over the
    /// trailing window ending at `now`
    pub async fn run_backtest(
        &self,
        symbol: &str,
        interval: &str,
        now: DateTime<Utc>,
    ) -> Result<BacktestResult, BacktestError> {
        let coin_id = map_symbol_to_coin_id(symbol).map_err(|e| {
            warn!("Rejected backtest request: {}", e);
            BacktestError::UnsupportedSymbol(symbol.to_string())
        })?;
        let interval: Interval = interval.parse().map_err(|e| {
            warn!("Rejected backtest request: {}", e);
            BacktestError::from(e)
        })?;
        let start = self.window_start(now).map_err(|e| {
            warn!("Rejected backtest request: {}", e);
            e
        })?;

        self.rate_guard
            .try_acquire(now.timestamp_millis())
            .map_err(|retry_after_ms| {
                warn!(
                    "Backtest for {} rate limited, {}ms remaining",
                    symbol, retry_after_ms
                );
                BacktestError::RateLimited { retry_after_ms }
            })?;

        info!(
            "Starting backtest: symbol={}, interval={}, window={} days",
            symbol,
            interval,
            self.lookback_days
        );

        let params = HistoricalPriceParams::new(coin_id, start, now)
            .with_vs_currency(self.vs_currency.as_str());

        let samples = self.source.fetch_prices(&params).await.map_err(|e| {
            error!("Failed to fetch prices for {}: {}", coin_id, e);
            BacktestError::from(e)
        })?;
        info!("Fetched {} price samples for {}", samples.len(), coin_id);

        let result = self.engine.run(samples, interval).map_err(|e| {
            warn!("Backtest for {} produced no result: {}", symbol, e);
            BacktestError::from(e)
        })?;

        self.persist_trades(&result).await;
        Ok(result)
    }

    /// Save every trade of the run; failures are logged and never fail the run
    async fn persist_trades(&self, result: &BacktestResult) {
        let mut failures = 0usize;
        for trade in &result.trades {
            if let Err(e) = self.sink.save(trade).await {
                failures += 1;
                error!(
                    "Failed to persist {} trade at {}: {}",
                    trade.kind, trade.timestamp, e
                );
            }
        }

        if failures == 0 {
            debug!("Persisted {} trades", result.trades.len());
        } else {
            warn!(
                "Persisted {} of {} trades",
                result.trades.len() - failures,
                result.trades.len()
            );
        }
    }
}
