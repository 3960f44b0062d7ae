// source/traits.rs

use super::{HistoricalPriceParams, SourceError};
use async_trait::async_trait;
use backtest_common::data::types::PriceSample;

/// Historical price feed the backtest pulls its samples from
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch raw price samples for the requested coin and time range
    async fn fetch_prices(
        &self,
        params: &HistoricalPriceParams,
    ) -> Result<Vec<PriceSample>, SourceError>;
}
