use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::backtest::StrategyConfig;
use crate::service::MAX_LOOKBACK_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub base_url: String,
    pub vs_currency: String,
    pub timeout_secs: u64,
    pub lookback_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimit {
    pub min_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Trade persistence; runs are not persisted when absent
    pub database: Option<Database>,
    pub source: Source,
    pub strategy: StrategyConfig,
    pub rate_limit: RateLimit,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Self::defaults()?
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        if let Ok(api_url) = std::env::var("COINGECKO_API_URL") {
            builder = builder.set_override("source.base_url", api_url)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let strategy = StrategyConfig::default();

        Config::builder()
            .set_default("source.base_url", "https://api.coingecko.com")?
            .set_default("source.vs_currency", "usd")?
            .set_default("source.timeout_secs", 30_i64)?
            .set_default("source.lookback_days", 30_i64)?
            .set_default("strategy.stop_loss_pct", strategy.stop_loss_pct)?
            .set_default("strategy.take_profit_pct", strategy.take_profit_pct)?
            .set_default("strategy.lookback", strategy.lookback as i64)?
            .set_default("rate_limit.min_interval_secs", 30_i64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy
            .validate()
            .map_err(|e| ConfigError::Message(format!("strategy: {}", e)))?;

        if self.source.lookback_days <= 0 || self.source.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Message(format!(
                "source.lookback_days must be in 1..={}",
                MAX_LOOKBACK_DAYS
            )));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "source.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        let settings: Settings = Settings::defaults()?
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("").unwrap();
        assert!(settings.database.is_none());
        assert_eq!(settings.source.base_url, "https://api.coingecko.com");
        assert_eq!(settings.source.lookback_days, 30);
        assert_eq!(settings.strategy, StrategyConfig::default());
        assert_eq!(settings.rate_limit.min_interval_secs, 30);
    }

    #[test]
    fn test_file_overrides() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://localhost/backtest"
            max_connections = 2

            [strategy]
            stop_loss_pct = 0.03
            take_profit_pct = 0.08
            lookback = 20
            "#,
        )
        .unwrap();

        let database = settings.database.unwrap();
        assert_eq!(database.max_connections, 2);
        assert_eq!(settings.strategy.stop_loss_pct, 0.03);
        assert_eq!(settings.strategy.take_profit_pct, 0.08);
        assert_eq!(settings.strategy.lookback, 20);
    }

    #[test]
    fn test_database_max_connections_default() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://localhost/backtest"
            "#,
        )
        .unwrap();

        assert_eq!(settings.database.unwrap().max_connections, 5);
    }

    #[test]
    fn test_lookback_days_bounds() {
        assert!(from_toml("[source]\nlookback_days = 3650").is_ok());
        assert!(from_toml("[source]\nlookback_days = 0").is_err());
        assert!(from_toml("[source]\nlookback_days = 200000000").is_err());
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let result = from_toml(
            r#"
            [strategy]
            stop_loss_pct = 1.5
            "#,
        );
        assert!(result.is_err());
    }
}
