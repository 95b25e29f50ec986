//! Gateway configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use classification::ClassifierSettings;
use common::BreakerSettings;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown log format: {0} (expected plain or json)")]
    UnknownLogFormat(String),
}

/// Output format for tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

/// Gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BILLER_TIMEOUT_MS`: per-call biller timeout (default: `30000`)
/// - `BREAKER_FAILURE_THRESHOLD`: consecutive failures before a breaker opens (default: `3`)
/// - `BREAKER_RESET_TIMEOUT_SECS`: minimum open time before a probe (default: `60`)
/// - `CLASSIFICATION_TIMEOUT_MS`: classification lookup timeout (default: `2000`)
/// - `MAX_CONFLICT_RETRIES`: retries after a stale-version save (default: `2`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `plain` or `json` (default: `plain`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub biller_timeout: Duration,
    pub breaker: BreakerSettings,
    pub classification_timeout: Duration,
    pub max_conflict_retries: u32,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            biller_timeout: env_parse("BILLER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.biller_timeout),
            breaker: BreakerSettings::new(
                env_parse("BREAKER_FAILURE_THRESHOLD").unwrap_or(defaults.breaker.failure_threshold),
                env_parse("BREAKER_RESET_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.breaker.reset_timeout),
            ),
            classification_timeout: env_parse("CLASSIFICATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.classification_timeout),
            max_conflict_retries: env_parse("MAX_CONFLICT_RETRIES")
                .unwrap_or(defaults.max_conflict_retries),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: env_parse("LOG_FORMAT").unwrap_or(defaults.log_format),
        }
    }

    /// Settings for the classification lookup.
    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            timeout: self.classification_timeout,
            breaker: self.breaker,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            biller_timeout: Duration::from_millis(30_000),
            breaker: BreakerSettings::new(3, Duration::from_secs(60)),
            classification_timeout: Duration::from_millis(2_000),
            max_conflict_retries: domain::DEFAULT_MAX_CONFLICT_RETRIES,
            log_level: "info".to_string(),
            log_format: LogFormat::Plain,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
