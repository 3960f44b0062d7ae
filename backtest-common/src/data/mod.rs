pub mod repository;
pub mod types;

pub use repository::{MemoryTradeSink, TradeRepository, TradeSink};
pub use types::*;
