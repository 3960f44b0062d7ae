// =================================================================
// source/coingecko.rs - CoinGecko Price Source
// =================================================================

use async_trait::async_trait;
use backtest_common::data::types::PriceSample;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    errors::SourceError, traits::PriceSource, types::HistoricalPriceParams,
    utils::convert_market_chart_to_samples, MarketChartResponse,
};

// Constants
const COINGECKO_API_URL: &str = "https://api.coingecko.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// CoinGecko REST client for historical price ranges
pub struct CoinGeckoSource {
    api_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl CoinGeckoSource {
    /// Create a client against the public CoinGecko API
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_API_URL)
    }

    /// Create a client against a custom base URL (proxy, mirror, test server)
    pub fn with_base_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn range_url(&self, coin_id: &str) -> String {
        format!(
            "{}/api/v3/coins/{}/market_chart/range",
            self.api_url, coin_id
        )
    }

    /// Parse a `market_chart/range` body into price samples
    fn parse_market_chart(&self, text: &str) -> Result<Vec<PriceSample>, SourceError> {
        let response: MarketChartResponse = serde_json::from_str(text)?;
        Ok(convert_market_chart_to_samples(&response))
    }
}

/// Classify a non-success HTTP status
fn status_error(status: StatusCode, body: &str) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        SourceError::RateLimit(format!("HTTP {}: {}", status, body))
    } else {
        SourceError::ApiError(format!("HTTP {}: {}", status, body))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch_prices(
        &self,
        params: &HistoricalPriceParams,
    ) -> Result<Vec<PriceSample>, SourceError> {
        if params.coin_id.is_empty() {
            return Err(SourceError::InvalidSymbol(
                "Coin id cannot be empty".to_string(),
            ));
        }

        let url = self.range_url(&params.coin_id);
        debug!(
            "Fetching price range from: {} ({} -> {})",
            url,
            params.from_secs(),
            params.to_secs()
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", params.vs_currency.clone()),
                ("from", params.from_secs().to_string()),
                ("to", params.to_secs().to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text));
        }

        let body = response.text().await?;
        let samples = self.parse_market_chart(&body)?;

        info!(
            "Successfully fetched {} price samples for {}",
            samples.len(),
            params.coin_id
        );
        Ok(samples)
    }
}

impl Default for CoinGeckoSource {
    fn default() -> Self {
        Self::new()
    }
}
