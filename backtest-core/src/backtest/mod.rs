pub mod aggregator;
pub mod engine;
pub mod metrics;
pub mod strategy;

pub use aggregator::{aggregate, Interval, InvalidInterval};
pub use engine::{BacktestEngine, EngineError};
pub use metrics::summarize;
pub use strategy::{PositionState, StrategyConfig, StrategyEngine};
