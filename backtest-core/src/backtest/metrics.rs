// backtest-core/src/backtest/metrics.rs

use backtest_common::data::types::{BacktestResult, Trade, TradeKind, TradeStats};

/// Reduce a trade ledger into a [`BacktestResult`].
///
/// Returns `None` for an empty ledger so callers can tell "no trades" apart
/// from a run whose statistics happen to be zero.
pub fn summarize(trades: Vec<Trade>) -> Option<BacktestResult> {
    if trades.is_empty() {
        return None;
    }

    let closing: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_sell())
        .map(|t| t.profit)
        .collect();

    let total_profit: f64 = closing.iter().sum();
    let winning = closing.iter().filter(|p| **p > 0.0).count();
    let losing = closing.iter().filter(|p| **p < 0.0).count();

    let win_rate = if closing.is_empty() {
        0.0
    } else {
        winning as f64 / closing.len() as f64 * 100.0
    };

    let stats = TradeStats {
        closed_trades: closing.len() as u32,
        winning_trades: winning as u32,
        losing_trades: losing as u32,
        avg_profit_per_trade: if closing.is_empty() {
            0.0
        } else {
            total_profit / closing.len() as f64
        },
        largest_winning_trade: closing.iter().copied().filter(|p| *p > 0.0).fold(0.0, f64::max),
        largest_losing_trade: closing.iter().copied().filter(|p| *p < 0.0).fold(0.0, f64::min),
        profit_factor: calculate_profit_factor(&closing),
        open_position: trades.last().map(|t| t.kind) == Some(TradeKind::Buy),
    };

    Some(BacktestResult {
        trade_count: trades.len(),
        trades,
        total_profit,
        win_rate,
        stats,
    })
}

fn calculate_profit_factor(profits: &[f64]) -> f64 {
    let gross_profit: f64 = profits.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = profits.iter().filter(|p| **p < 0.0).map(|p| -p).sum();

    if gross_loss == 0.0 {
        return if gross_profit == 0.0 { 1.0 } else { f64::INFINITY };
    }
    gross_profit / gross_loss
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Vec<Trade> {
        vec![
            Trade::buy(90.0, 1.0, 0),
            Trade::sell(95.0, 1.0, 1, 5.0),
            Trade::buy(100.0, 1.0, 2),
            Trade::sell(94.0, 1.0, 3, -6.0),
            Trade::buy(80.0, 1.0, 4),
            Trade::sell(88.0, 1.0, 5, 8.0),
        ]
    }

    #[test]
    fn test_empty_ledger_is_distinguishable() {
        assert!(summarize(Vec::new()).is_none());
    }

    #[test]
    fn test_profit_sums_closing_trades_only() {
        let result = summarize(ledger()).unwrap();
        assert!((result.total_profit - 7.0).abs() < 1e-9);
        assert_eq!(result.trade_count, 6);
        assert_eq!(result.trades.len(), 6);
    }

    #[test]
    fn test_win_rate_over_closing_trades() {
        let result = summarize(ledger()).unwrap();
        assert!((result.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!(result.win_rate >= 0.0 && result.win_rate <= 100.0);
    }

    #[test]
    fn test_buy_only_ledger() {
        let result = summarize(vec![Trade::buy(85.0, 1.0, 0)]).unwrap();
        assert_eq!(result.total_profit, 0.0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.trade_count, 1);
        assert_eq!(result.stats.closed_trades, 0);
        assert_eq!(result.stats.avg_profit_per_trade, 0.0);
        assert!(result.stats.open_position);
    }

    #[test]
    fn test_trade_stats() {
        let result = summarize(ledger()).unwrap();
        let stats = result.stats;

        assert_eq!(stats.closed_trades, 3);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.largest_winning_trade, 8.0);
        assert_eq!(stats.largest_losing_trade, -6.0);
        assert!((stats.avg_profit_per_trade - 7.0 / 3.0).abs() < 1e-9);
        assert!((stats.profit_factor - 13.0 / 6.0).abs() < 1e-9);
        assert!(!stats.open_position);
    }

    #[test]
    fn test_profit_factor_edges() {
        assert_eq!(calculate_profit_factor(&[]), 1.0);
        assert_eq!(calculate_profit_factor(&[2.0]), f64::INFINITY);
        assert_eq!(calculate_profit_factor(&[-2.0]), 0.0);
    }
}
