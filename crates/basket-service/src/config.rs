//! # Service Configuration
//!
//! Loaded once at startup from environment variables with fallback to
//! defaults. Nothing here is read again while pricing.
//!
//! ## Environment Variables
//! | Variable                     | Default      | Meaning                        |
//! |------------------------------|--------------|--------------------------------|
//! | `BASKET_DB_PATH`             | `basket.db`  | SQLite file, or `:memory:`     |
//! | `BASKET_DISCOUNT_THRESHOLD`  | `0`          | shared campaign threshold      |
//! | `GIVEN_AMOUNT`               |              | legacy alias of the threshold  |
//! | `BASKET_AGGREGATE_POLICY`    | `degrade`    | `degrade` or `fail-fast`       |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use basket_core::{DiscountPolicy, Money};
use serde::Serialize;

pub const ENV_DB_PATH: &str = "BASKET_DB_PATH";
pub const ENV_DISCOUNT_THRESHOLD: &str = "BASKET_DISCOUNT_THRESHOLD";
pub const ENV_DISCOUNT_THRESHOLD_LEGACY: &str = "GIVEN_AMOUNT";
pub const ENV_AGGREGATE_POLICY: &str = "BASKET_AGGREGATE_POLICY";

const DEFAULT_DB_PATH: &str = "basket.db";

/// What to do when a historical aggregate cannot be fetched.
///
/// ```text
/// Degrade  ──► aggregate counts as 0, its rule scores 0, warn! is logged
/// FailFast ──► the whole operation fails with AGGREGATE_LOOKUP_FAILED
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregateFailurePolicy {
    #[default]
    Degrade,
    FailFast,
}

impl FromStr for AggregateFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(AggregateFailurePolicy::Degrade),
            "fail-fast" | "fail_fast" | "failfast" => Ok(AggregateFailurePolicy::FailFast),
            _ => Err(ConfigError::InvalidValue(ENV_AGGREGATE_POLICY.to_string())),
        }
    }
}

impl fmt::Display for AggregateFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFailurePolicy::Degrade => f.write_str("degrade"),
            AggregateFailurePolicy::FailFast => f.write_str("fail-fast"),
        }
    }
}

/// Basket service configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Campaign threshold shared by the history-based rules
    pub discount: DiscountPolicy,

    /// Aggregate lookup failure handling
    pub aggregate_failure: AggregateFailurePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            discount: DiscountPolicy::new(Money::zero()),
            aggregate_failure: AggregateFailurePolicy::Degrade,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServiceConfig::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            if path.trim().is_empty() {
                return Err(ConfigError::MissingRequired(ENV_DB_PATH.to_string()));
            }
            config.database_path = PathBuf::from(path);
        }

        let threshold = lookup(ENV_DISCOUNT_THRESHOLD)
            .map(|raw| (ENV_DISCOUNT_THRESHOLD, raw))
            .or_else(|| lookup(ENV_DISCOUNT_THRESHOLD_LEGACY).map(|raw| (ENV_DISCOUNT_THRESHOLD_LEGACY, raw)));
        if let Some((key, raw)) = threshold {
            let amount: Money = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
            if amount.is_negative() {
                return Err(ConfigError::InvalidValue(key.to_string()));
            }
            config.discount = DiscountPolicy::new(amount);
        }

        if let Some(raw) = lookup(ENV_AGGREGATE_POLICY) {
            config.aggregate_failure = raw.parse()?;
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
