//! # Tradeq Config
//!
//! Configuration for the trade pipeline. Values are layered from compiled
//! defaults, optional TOML files, `TRADEQ__` environment variables and the
//! flat variable names the worker deployment already exports.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
