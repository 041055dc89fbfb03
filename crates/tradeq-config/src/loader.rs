//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};
use tradeq_core::{TradeqError, TradeqResult};

/// Flat environment variable names and the config keys they override.
///
/// These are the names existing deployments export, so they take priority
/// over everything else.
pub const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("REDIS_URL", "redis.url"),
    ("DATABASE_URL", "database.url"),
    ("TRADE_QUEUE_KEY", "queue.ready_key"),
    ("TRADE_PROCESSING_KEY", "queue.processing_key"),
    ("TRADE_DLQ_KEY", "queue.dead_letter_key"),
    ("WORKER_NAME", "queue.worker_name"),
    ("BLPOP_TIMEOUT_SECONDS", "worker.reserve_timeout_secs"),
    ("IDLE_SLEEP_SECONDS", "worker.idle_sleep_secs"),
    ("MAX_ATTEMPTS", "worker.max_attempts"),
    ("RETRY_BACKOFF_SECONDS", "worker.retry_backoff_secs"),
];

/// Variable selecting the environment-specific file.
pub const ENVIRONMENT_VAR: &str = "TRADEQ_ENVIRONMENT";

/// Layered configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader reading TOML files from `config_dir`.
    ///
    /// Sources, lowest priority first:
    /// 1. compiled defaults
    /// 2. `{config_dir}/default.toml`
    /// 3. `{config_dir}/{environment}.toml`
    /// 4. `{config_dir}/local.toml`
    /// 5. `TRADEQ__SECTION__KEY` environment variables
    /// 6. the flat names in [`LEGACY_ENV_VARS`]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Creates a loader for the default location (`./config`).
    #[must_use]
    pub fn from_default_location() -> Self {
        Self::new("./config")
    }

    /// Loads `.env` if present and builds the configuration from the process
    /// environment.
    pub fn load(&self) -> TradeqResult<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let env: HashMap<String, String> = std::env::vars().collect();
        self.load_from(&env)
    }

    /// Builds the configuration against an explicit environment map.
    pub fn load_from(&self, env: &HashMap<String, String>) -> TradeqResult<AppConfig> {
        let environment = env
            .get(ENVIRONMENT_VAR)
            .cloned()
            .unwrap_or_else(|| "development".to_string());

        info!(environment = %environment, config_dir = %self.config_dir.display(), "Loading configuration");

        let mut builder = Config::builder()
            .set_default("app.environment", environment.as_str())
            .map_err(config_error_to_tradeq_error)?;

        for name in ["default", environment.as_str(), "local"] {
            builder = self.add_file(builder, name);
        }

        builder = builder.add_source(
            Environment::with_prefix("TRADEQ")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        for (var, key) in LEGACY_ENV_VARS {
            let value = env.get(*var).filter(|v| !v.is_empty()).cloned();
            if value.is_some() {
                debug!(var = %var, key = %key, "Applying flat environment override");
            }
            builder = builder
                .set_override_option(*key, value)
                .map_err(config_error_to_tradeq_error)?;
        }

        let app_config: AppConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error_to_tradeq_error)?;

        ConfigValidator::validate(&app_config)
            .map_err(|errors| TradeqError::Configuration(format_validation_errors(&errors)))?;

        Ok(app_config)
    }

    fn add_file(
        &self,
        builder: ConfigBuilder<DefaultState>,
        name: &str,
    ) -> ConfigBuilder<DefaultState> {
        let path = self.config_dir.join(format!("{name}.toml"));
        if !path.exists() {
            return builder;
        }
        debug!("Loading config from: {}", path.display());
        builder.add_source(File::from(path).required(false))
    }
}

fn config_error_to_tradeq_error(err: ConfigError) -> TradeqError {
    TradeqError::Configuration(err.to_string())
}
