//! Result type aliases for Tradeq.

use crate::TradeqError;

/// A specialized `Result` type for Tradeq operations.
pub type TradeqResult<T> = Result<T, TradeqError>;
