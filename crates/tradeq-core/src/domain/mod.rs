//! Domain layer types.

pub mod trade;

pub use trade::*;
