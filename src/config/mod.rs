use std::env;
use std::fmt;

use chrono::Duration;

use crate::engines::flags::ReadFailurePolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for embedding the engines.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub engines: EngineSettings,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables shared across the engines. Defaults mirror observed production
/// behavior; every knob can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Feature-flag cache TTL.
    pub flag_cache_ttl: Duration,
    /// Behavior of the flag read path when the store errors.
    pub flag_failure_policy: ReadFailurePolicy,
    /// How far back diagnoses and lab results are scanned for isolation rules.
    pub chart_lookback_days: i64,
    /// Window inside which repeated transfer notifications are suppressed.
    pub notify_dedup_window: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            flag_cache_ttl: Duration::minutes(5),
            flag_failure_policy: ReadFailurePolicy::FailOpen,
            chart_lookback_days: 30,
            notify_dedup_window: Duration::minutes(15),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("WARDFLOW_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("WARDFLOW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut engines = EngineSettings::default();

        if let Ok(minutes) = env::var("WARDFLOW_FLAG_TTL_MINUTES") {
            let minutes = minutes
                .parse::<i64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidFlagTtl)?;
            engines.flag_cache_ttl = Duration::minutes(minutes);
        }

        if let Ok(policy) = env::var("WARDFLOW_FLAG_FAILURE_POLICY") {
            engines.flag_failure_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "fail_open" | "open" => ReadFailurePolicy::FailOpen,
                "fail_closed" | "closed" => ReadFailurePolicy::FailClosed,
                other => {
                    return Err(ConfigError::InvalidFailurePolicy {
                        value: other.to_string(),
                    })
                }
            };
        }

        if let Ok(days) = env::var("WARDFLOW_CHART_LOOKBACK_DAYS") {
            engines.chart_lookback_days = days
                .parse::<i64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidLookback)?;
        }

        if let Ok(minutes) = env::var("WARDFLOW_NOTIFY_DEDUP_MINUTES") {
            let minutes = minutes
                .parse::<i64>()
                .ok()
                .filter(|value| *value >= 0)
                .ok_or(ConfigError::InvalidDedupWindow)?;
            engines.notify_dedup_window = Duration::minutes(minutes);
        }

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            engines,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidFlagTtl,
    InvalidFailurePolicy { value: String },
    InvalidLookback,
    InvalidDedupWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidFlagTtl => {
                write!(f, "WARDFLOW_FLAG_TTL_MINUTES must be a positive integer")
            }
            ConfigError::InvalidFailurePolicy { value } => {
                write!(
                    f,
                    "WARDFLOW_FLAG_FAILURE_POLICY must be fail_open or fail_closed, got '{value}'"
                )
            }
            ConfigError::InvalidLookback => {
                write!(f, "WARDFLOW_CHART_LOOKBACK_DAYS must be a positive integer")
            }
            ConfigError::InvalidDedupWindow => {
                write!(f, "WARDFLOW_NOTIFY_DEDUP_MINUTES must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
