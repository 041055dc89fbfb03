//! # Tradeq Repository
//!
//! Postgres persistence for trades.
//!
//! ```text
//! Consumer ──TradeSink::apply──► PgTradeRepository ──upsert──► trades_raw
//! readers  ──TradeRepository──►         │
//! ```
//!
//! [`PgTradeRepository`] is both the idempotent sink used by the consumption
//! loop and the read path (point lookup and filtered listing).

pub mod pool;
pub mod postgres;
pub mod traits;

pub use pool::*;
pub use postgres::*;
pub use traits::*;
