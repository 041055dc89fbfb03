//! PostgreSQL trade repository and idempotent sink.

use crate::traits::{TradeQuery, TradeRecord, TradeRepository};
use crate::DatabasePool;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use tradeq_core::{Trade, TradeSink, TradeqResult};

const UPSERT_TRADE: &str = r"
    INSERT INTO trades_raw (trade_id, user_id, symbol, price)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (trade_id) DO UPDATE SET
        user_id    = EXCLUDED.user_id,
        symbol     = EXCLUDED.symbol,
        price      = EXCLUDED.price,
        updated_at = CASE
            WHEN (trades_raw.user_id, trades_raw.symbol, trades_raw.price)
                IS DISTINCT FROM (EXCLUDED.user_id, EXCLUDED.symbol, EXCLUDED.price)
            THEN now()
            ELSE trades_raw.updated_at
        END
";

/// PostgreSQL trade repository.
///
/// Doubles as the consumer's sink: writes are keyed by `trade_id`, so
/// redelivered trades overwrite rather than duplicate. `updated_at` only
/// moves when a field actually changes, so a redelivery leaves the row as is.
#[derive(Clone)]
pub struct PgTradeRepository {
    pool: Arc<DatabasePool>,
}

impl PgTradeRepository {
    /// Creates a new PostgreSQL trade repository.
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TradeSink for PgTradeRepository {
    async fn apply(&self, trade: &Trade) -> TradeqResult<()> {
        // An early return drops the transaction, which rolls it back.
        let mut tx = self.pool.inner().begin().await?;

        sqlx::query(UPSERT_TRADE)
            .bind(&trade.trade_id)
            .bind(&trade.user)
            .bind(&trade.symbol)
            .bind(trade.price)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(trade_id = %trade.trade_id, "Upserted trade");
        Ok(())
    }
}

#[async_trait]
impl TradeRepository for PgTradeRepository {
    async fn find_by_trade_id(&self, trade_id: &str) -> TradeqResult<Option<TradeRecord>> {
        debug!("Finding trade by id: {}", trade_id);

        let row = sqlx::query_as::<_, TradeRecord>(
            r"
            SELECT trade_id, user_id, symbol, price, created_at, updated_at
            FROM trades_raw
            WHERE trade_id = $1
            ",
        )
        .bind(trade_id)
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row)
    }

    async fn list(&self, query: &TradeQuery) -> TradeqResult<Vec<TradeRecord>> {
        debug!(?query, "Listing trades");

        let rows = sqlx::query_as::<_, TradeRecord>(
            r"
            SELECT trade_id, user_id, symbol, price, created_at, updated_at
            FROM trades_raw
            WHERE ($1::TEXT IS NULL OR symbol = $1)
              AND ($2::TEXT IS NULL OR user_id = $2)
            ORDER BY created_at DESC, trade_id
            LIMIT $3
            ",
        )
        .bind(query.symbol.as_deref())
        .bind(query.user_id.as_deref())
        .bind(i64::from(query.effective_limit()))
        .fetch_all(self.pool.inner())
        .await?;

        Ok(rows)
    }
}
