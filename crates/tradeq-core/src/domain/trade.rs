//! Trade business record.

use crate::validation::{rules, ValidateExt};
use crate::{TradeqError, TradeqResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A trade event as it travels through the queue.
///
/// `trade_id` is the business idempotency key: the store keeps at most one
/// row per id and later deliveries overwrite the mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Trade {
    /// Business idempotency key.
    #[validate(length(min = 1, max = 128, message = "trade_id must be 1-128 characters"))]
    pub trade_id: String,

    /// Owning user. Stored in the `user_id` column.
    #[validate(length(min = 1, max = 128, message = "user must be 1-128 characters"))]
    pub user: String,

    /// Instrument symbol.
    #[validate(length(min = 1, max = 128, message = "symbol must be 1-128 characters"))]
    pub symbol: String,

    /// Execution price.
    pub price: f64,
}

impl Trade {
    /// Creates a new trade.
    pub fn new(
        trade_id: impl Into<String>,
        user: impl Into<String>,
        symbol: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            trade_id: trade_id.into(),
            user: user.into(),
            symbol: symbol.into(),
            price,
        }
    }

    /// Checks the trade before it is accepted for ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`TradeqError::Validation`] when a field is missing, blank,
    /// too long, or the price is not a finite number.
    pub fn ensure_valid(&self) -> TradeqResult<()> {
        self.validate_request()?;

        for (field, value) in [
            ("trade_id", &self.trade_id),
            ("user", &self.user),
            ("symbol", &self.symbol),
        ] {
            if rules::not_blank(value).is_err() {
                return Err(TradeqError::validation(format!("{field}: must not be blank")));
            }
        }

        if rules::finite_price(self.price).is_err() {
            return Err(TradeqError::validation("price: must be a finite number"));
        }

        Ok(())
    }
}
