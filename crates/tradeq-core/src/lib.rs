//! # Tradeq Core
//!
//! Core types, traits, and error definitions shared by every crate of the
//! trade pipeline: the [`Trade`] business record, the [`TradeSink`] seam the
//! queue consumer persists through, and the unified [`TradeqError`].

pub mod domain;
pub mod error;
pub mod result;
pub mod telemetry;
pub mod traits;
pub mod validation;

pub use domain::*;
pub use error::*;
pub use result::*;
pub use traits::*;
pub use validation::*;
