// =================================================================
// data/repository.rs - Trade Persistence
// =================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::types::{DataError, Trade, TradeKind};

/// Append-only destination for simulated trades
#[async_trait]
pub trait TradeSink: Send + Sync {
    /// Persist a single trade
    async fn save(&self, trade: &Trade) -> Result<(), DataError>;
}

const CREATE_TRADES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS backtest_trades (
    id BIGSERIAL PRIMARY KEY,
    kind TEXT NOT NULL,
    quantity DOUBLE PRECISION NOT NULL,
    price DOUBLE PRECISION NOT NULL,
    executed_at TIMESTAMPTZ NOT NULL,
    profit DOUBLE PRECISION NOT NULL DEFAULT 0
)
"#;

/// PostgreSQL-backed trade ledger
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the trades table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), DataError> {
        sqlx::query(CREATE_TRADES_TABLE).execute(&self.pool).await?;
        debug!("backtest_trades schema verified");
        Ok(())
    }

    /// Load persisted trades, newest first
    pub async fn fetch_all(&self, limit: Option<i64>) -> Result<Vec<Trade>, DataError> {
        let rows = sqlx::query(
            "SELECT kind, quantity, price, executed_at, profit FROM backtest_trades \
             ORDER BY executed_at DESC, id DESC LIMIT $1",
        )
        .bind(limit.unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut trades = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.try_get("kind")?;
            let executed_at: DateTime<Utc> = row.try_get("executed_at")?;
            trades.push(Trade {
                kind: kind.parse::<TradeKind>()?,
                quantity: row.try_get("quantity")?,
                price: row.try_get("price")?,
                timestamp: executed_at.timestamp_millis(),
                profit: row.try_get("profit")?,
            });
        }

        info!("Loaded {} persisted trades", trades.len());
        Ok(trades)
    }
}

#[async_trait]
impl TradeSink for TradeRepository {
    async fn save(&self, trade: &Trade) -> Result<(), DataError> {
        let executed_at = trade.executed_at().ok_or_else(|| {
            DataError::Validation(format!("Invalid trade timestamp {}", trade.timestamp))
        })?;

        sqlx::query(
            "INSERT INTO backtest_trades (kind, quantity, price, executed_at, profit) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(trade.kind.as_str())
        .bind(trade.quantity)
        .bind(trade.price)
        .bind(executed_at)
        .bind(trade.profit)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-process trade ledger, used for dry runs
#[derive(Default)]
pub struct MemoryTradeSink {
    trades: Mutex<Vec<Trade>>,
}

impl MemoryTradeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.trades.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.trades.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trades.lock().await.is_empty()
    }
}

#[async_trait]
impl TradeSink for MemoryTradeSink {
    async fn save(&self, trade: &Trade) -> Result<(), DataError> {
        self.trades.lock().await.push(trade.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_appends_in_order() {
        let sink = MemoryTradeSink::new();
        assert!(sink.is_empty().await);

        sink.save(&Trade::buy(85.0, 1.0, 0)).await.unwrap();
        sink.save(&Trade::sell(90.0, 1.0, 3_600_000, 5.0))
            .await
            .unwrap();

        let trades = sink.trades().await;
        assert_eq!(sink.len().await, 2);
        assert_eq!(trades[0].kind, TradeKind::Buy);
        assert_eq!(trades[1].kind, TradeKind::Sell);
        assert_eq!(trades[1].profit, 5.0);
    }
}
