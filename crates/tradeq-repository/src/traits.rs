//! Repository trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradeq_core::TradeqResult;

/// A stored trade row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradeRecord {
    pub trade_id: String,
    pub user_id: String,
    pub symbol: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing trades.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuery {
    /// Only trades for this symbol.
    pub symbol: Option<String>,
    /// Only trades for this user.
    pub user_id: Option<String>,
    /// Maximum rows; see [`TradeQuery::effective_limit`].
    pub limit: Option<u32>,
}

impl TradeQuery {
    /// Limit used when none is given.
    pub const DEFAULT_LIMIT: u32 = 50;
    /// Largest limit honoured.
    pub const MAX_LIMIT: u32 = 500;

    /// Returns the requested limit clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// Read access to stored trades.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Finds a trade by its business key.
    async fn find_by_trade_id(&self, trade_id: &str) -> TradeqResult<Option<TradeRecord>>;

    /// Lists trades matching the query, newest first.
    async fn list(&self, query: &TradeQuery) -> TradeqResult<Vec<TradeRecord>>;
}
