use anyhow::{bail, Context};
use backtest_common::data::{MemoryTradeSink, TradeRepository, TradeSink};
use chrono::{DateTime, Utc};
use clap::Parser;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use backtest_core::{
    config::{Database, Settings},
    service::BacktestService,
    source::CoinGeckoSource,
};

#[derive(Parser)]
#[command(name = "backtest")]
#[command(about = "Stop-loss/take-profit backtest simulator over CoinGecko price history")]
enum Commands {
    /// Run a backtest over the trailing price window
    Run {
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,
        #[arg(short, long, default_value = "4h")]
        interval: String,
        /// Keep trades in memory instead of writing them to the database
        #[arg(long)]
        dry_run: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the supported trading pairs
    Symbols,
    /// Show persisted trades, newest first
    History {
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
}

async fn connect(database: &Database) -> anyhow::Result<TradeRepository> {
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    let repository = TradeRepository::new(pool);
    repository.ensure_schema().await?;
    info!("Database connection established");
    Ok(repository)
}

fn format_time(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let command = Commands::parse();

    let load_settings = || Settings::new().context("Failed to load settings");

    match command {
        Commands::Symbols => {
            for symbol in BacktestService::supported_symbols() {
                println!("{}", symbol);
            }
        }

        Commands::History { limit } => {
            let settings = load_settings()?;
            let Some(database) = settings.database.as_ref() else {
                bail!("No database configured; set DATABASE_URL or [database] in the config file");
            };
            let repository = connect(database).await?;
            for trade in repository.fetch_all(Some(limit)).await? {
                println!(
                    "{} {:<4} {} @ {:.2} profit {:.2}",
                    format_time(trade.timestamp),
                    trade.kind,
                    trade.quantity,
                    trade.price,
                    trade.profit
                );
            }
        }

        Commands::Run {
            symbol,
            interval,
            dry_run,
            json,
        } => {
            let settings = load_settings()?;
            let sink: Arc<dyn TradeSink> = match (&settings.database, dry_run) {
                (Some(database), false) => Arc::new(connect(database).await?),
                (None, false) => {
                    warn!("No database configured, trades will not be persisted");
                    Arc::new(MemoryTradeSink::new())
                }
                (_, true) => Arc::new(MemoryTradeSink::new()),
            };

            let source = CoinGeckoSource::with_base_url(settings.source.base_url.as_str())
                .with_timeout(Duration::from_secs(settings.source.timeout_secs));

            let service = BacktestService::new(Arc::new(source), sink, settings.strategy)
                .with_lookback_days(settings.source.lookback_days)
                .with_min_interval(Duration::from_secs(settings.rate_limit.min_interval_secs))
                .with_vs_currency(settings.source.vs_currency.as_str());

            let result = match service.run_backtest(&symbol, &interval, Utc::now()).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Backtest failed: {}", e);
                    bail!(e.user_message());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            println!("\nBacktest Results ({} {}):", symbol, interval);
            println!("Total Profit: {:.2}", result.total_profit);
            println!("Total Trades: {}", result.trade_count);
            println!("Win Rate: {:.2}%", result.win_rate);
            println!("Profit Factor: {:.2}", result.stats.profit_factor);
            println!("Largest Win: {:.2}", result.stats.largest_winning_trade);
            println!("Largest Loss: {:.2}", result.stats.largest_losing_trade);
            if result.stats.open_position {
                println!("Note: the last position is still open");
            }
            println!("\nTrade History:");
            for trade in &result.trades {
                println!(
                    "{} {} {} @ {:.2}",
                    format_time(trade.timestamp),
                    trade.kind,
                    trade.quantity,
                    trade.price
                );
            }
        }
    }

    Ok(())
}
