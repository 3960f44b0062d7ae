// source/mod.rs
pub mod coingecko;
pub mod errors;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export main interfaces for easy access
pub use coingecko::CoinGeckoSource;
pub use errors::SourceError;
pub use traits::PriceSource;
pub use types::*;
pub use utils::{map_symbol_to_coin_id, SUPPORTED_SYMBOLS};
