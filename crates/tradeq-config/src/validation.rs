//! Configuration validation module.
//!
//! Every rule runs and all failures are reported together, so a bad
//! deployment is rejected once at startup with the full list.

use crate::{AppConfig, DatabaseConfig, QueueConfig, RedisConfig, WorkerConfig};
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size is zero or exceeds the maximum allowed.
    PoolSizeOutOfRange { name: String, value: usize, maximum: usize },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Interval must be a finite, non-negative number of seconds.
    InvalidInterval { name: String, value: f64 },
    /// A queue list name is empty.
    EmptyKey { name: String },
    /// Two queue roles resolve to the same list.
    KeyCollision { first: String, second: String, key: String },
    /// A count that must be at least one is zero.
    ZeroCount { name: String },
    /// Log filter is empty.
    EmptyLogFilter,
    /// Metrics listen address does not parse.
    InvalidListenAddress { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({min}) cannot be greater than max ({max})"
                )
            }
            Self::PoolSizeOutOfRange { name, value, maximum } => {
                write!(f, "Pool size '{name}' must be 1-{maximum}, got {value}")
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {url_type} URL: {message}")
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{name}' must be positive, got {value}")
            }
            Self::InvalidInterval { name, value } => {
                write!(f, "Interval '{name}' must be a non-negative number of seconds, got {value}")
            }
            Self::EmptyKey { name } => write!(f, "Queue key '{name}' cannot be empty"),
            Self::KeyCollision { first, second, key } => {
                write!(f, "Queue keys '{first}' and '{second}' both resolve to '{key}'")
            }
            Self::ZeroCount { name } => write!(f, "'{name}' must be at least 1"),
            Self::EmptyLogFilter => write!(f, "Log filter cannot be empty"),
            Self::InvalidListenAddress { value } => {
                write!(f, "Metrics listen address '{value}' is not host:port")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_database(&config.database, &mut errors);
        Self::validate_queue(&config.queue, &mut errors);
        Self::validate_worker(&config.worker, &mut errors);

        if config.telemetry.filter.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyLogFilter);
        }

        if config.metrics.enabled && config.metrics.listen_addr().is_err() {
            errors.push(ConfigValidationError::InvalidListenAddress {
                value: config.metrics.listen.clone(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_redis(config: &RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        } else if let Err(e) = Url::parse(&config.url) {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            });
        }

        if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeOutOfRange {
                name: "redis.pool_size".to_string(),
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_database(config: &DatabaseConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !config.url.starts_with("postgres://") && !config.url.starts_with("postgresql://")
        {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with postgres:// or postgresql://".to_string(),
            });
        }

        if config.min_connections > config.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        let max = config.max_connections as usize;
        if max == 0 || max > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeOutOfRange {
                name: "database.max_connections".to_string(),
                value: max,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
        if config.idle_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.idle_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_queue(config: &QueueConfig, errors: &mut Vec<ConfigValidationError>) {
        let in_flight = config.in_flight_key();
        let roles = [
            ("queue.ready_key", config.ready_key.as_str()),
            ("queue.processing_key", in_flight.as_str()),
            ("queue.dead_letter_key", config.dead_letter_key.as_str()),
        ];

        for (name, key) in roles {
            if key.trim().is_empty() {
                errors.push(ConfigValidationError::EmptyKey {
                    name: name.to_string(),
                });
            }
        }

        for (i, (first, a)) in roles.iter().enumerate() {
            for (second, b) in &roles[i + 1..] {
                if !a.is_empty() && a == b {
                    errors.push(ConfigValidationError::KeyCollision {
                        first: (*first).to_string(),
                        second: (*second).to_string(),
                        key: (*a).to_string(),
                    });
                }
            }
        }

        if config.worker_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.push(ConfigValidationError::EmptyKey {
                name: "queue.worker_name".to_string(),
            });
        }

        if config.max_peek_limit == 0 {
            errors.push(ConfigValidationError::ZeroCount {
                name: "queue.max_peek_limit".to_string(),
            });
        }
    }

    fn validate_worker(config: &WorkerConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.reserve_timeout_secs == 0 {
            // Zero would make the blocking reserve wait forever.
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "worker.reserve_timeout_secs".to_string(),
                value: 0,
            });
        }
        if config.max_attempts == 0 {
            errors.push(ConfigValidationError::ZeroCount {
                name: "worker.max_attempts".to_string(),
            });
        }
        if config.connect_attempts == 0 {
            errors.push(ConfigValidationError::ZeroCount {
                name: "worker.connect_attempts".to_string(),
            });
        }

        let intervals = [
            ("worker.idle_sleep_secs", config.idle_sleep_secs),
            ("worker.retry_backoff_secs", config.retry_backoff_secs),
            ("worker.transport_error_pause_secs", config.transport_error_pause_secs),
            ("worker.connect_retry_interval_secs", config.connect_retry_interval_secs),
        ];
        for (name, value) in intervals {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigValidationError::InvalidInterval {
                    name: name.to_string(),
                    value,
                });
            }
        }
    }
}

/// Formats validation errors for display.
#[must_use]
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
