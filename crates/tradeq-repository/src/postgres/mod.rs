//! PostgreSQL repository implementations.

mod trade_repository;

pub use trade_repository::PgTradeRepository;
