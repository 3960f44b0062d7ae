// backtest-core/src/backtest/strategy.rs

use backtest_common::data::types::{Candle, Trade};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fixed quantity used for every simulated fill
pub const POSITION_SIZE: f64 = 1.0;

/// Thresholds for the long-only stop-loss/take-profit strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Entry drop below the recent high, and the loss that forces an exit
    pub stop_loss_pct: f64,
    /// Gain that forces an exit
    pub take_profit_pct: f64,
    /// Number of previous candles scanned for the recent high
    pub lookback: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.05,
            take_profit_pct: 0.05,
            lookback: 10,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0) {
            return Err(format!(
                "stop_loss_pct must be in (0, 1), got {}",
                self.stop_loss_pct
            ));
        }
        if !(self.take_profit_pct > 0.0 && self.take_profit_pct < 1.0) {
            return Err(format!(
                "take_profit_pct must be in (0, 1), got {}",
                self.take_profit_pct
            ));
        }
        if self.lookback == 0 {
            return Err("lookback must be at least 1 candle".to_string());
        }
        Ok(())
    }
}

/// Position held by the strategy between candles
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Long { entry_price: f64, opened_at: i64 },
}

/// Single-position state machine over an ordered candle sequence
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    config: StrategyConfig,
    state: PositionState,
}

impl StrategyEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            state: PositionState::Flat,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = PositionState::Flat;
    }

    /// Run the strategy over `candles` from a flat start.
    ///
    /// A position still open after the last candle is left open and does
    /// not produce a closing trade; inspect [`StrategyEngine::state`].
    pub fn run(&mut self, candles: &[Candle]) -> Vec<Trade> {
        self.reset();

        let mut trades = Vec::new();
        for index in 0..candles.len() {
            if let Some(trade) = self.on_candle(candles, index) {
                trades.push(trade);
            }
        }

        if let PositionState::Long {
            entry_price,
            opened_at,
        } = self.state
        {
            info!(
                "Run ended with an open position: entry {} at {}",
                entry_price, opened_at
            );
        }

        trades
    }

    /// Evaluate the candle at `index`, emitting at most one trade
    pub fn on_candle(&mut self, candles: &[Candle], index: usize) -> Option<Trade> {
        let candle = candles.get(index)?;

        match self.state {
            PositionState::Flat => {
                let start = index - self.config.lookback.min(index);
                let recent_high = candles[start..=index]
                    .iter()
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max);

                let threshold = recent_high * (1.0 - self.config.stop_loss_pct);
                if candle.close > 0.0 && candle.close < threshold {
                    debug!(
                        "BUY at {} (recent high {}, threshold {})",
                        candle.close, recent_high, threshold
                    );
                    self.state = PositionState::Long {
                        entry_price: candle.close,
                        opened_at: candle.open_time,
                    };
                    return Some(Trade::buy(candle.close, POSITION_SIZE, candle.open_time));
                }
                None
            }
            PositionState::Long { entry_price, .. } => {
                let profit_pct = (candle.close - entry_price) / entry_price;

                if profit_pct <= -self.config.stop_loss_pct
                    || profit_pct >= self.config.take_profit_pct
                {
                    let profit = (candle.close - entry_price) * POSITION_SIZE;
                    debug!(
                        "SELL at {} (entry {}, change {:.4})",
                        candle.close, entry_price, profit_pct
                    );
                    self.state = PositionState::Flat;
                    return Some(Trade::sell(
                        candle.close,
                        POSITION_SIZE,
                        candle.open_time,
                        profit,
                    ));
                }
                None
            }
        }
    }
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::new(StrategyConfig::default())
    }
}
