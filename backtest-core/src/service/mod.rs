pub mod backtest;
pub mod errors;
pub mod types;

// Re-export main interfaces
pub use backtest::{BacktestService, DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS};
pub use errors::BacktestError;
pub use types::*;
