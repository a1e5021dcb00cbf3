//! Environment configuration and validation of run settings.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use mandi_sync_ingest_models::RunConfig;
use mandi_sync_source::data_gov::{DEFAULT_BASE_URL, DEFAULT_RESOURCE_ID, DataGovConfig};

use crate::paths;

/// Longest accepted runtime budget.
pub const MAX_RUNTIME_LIMIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest accepted backoff ceiling, HTTP timeout, or inter-page pause.
pub const MAX_DELAY_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors in the process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing or blank.
    #[error("{name} must be set")]
    MissingEnv {
        /// Variable name.
        name: &'static str,
    },

    /// A setting has an unusable value.
    #[error("invalid {name}: {message}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    env_opt(name).ok_or(ConfigError::MissingEnv { name })
}

/// Builds the data.gov.in client settings from `DATA_GOV_API_KEY`,
/// `DATA_GOV_RESOURCE_ID` and `DATA_GOV_BASE_URL`, with timeouts taken from
/// `config`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] if `DATA_GOV_API_KEY` is not set.
pub fn data_gov_from_env(config: &RunConfig) -> Result<DataGovConfig, ConfigError> {
    Ok(DataGovConfig {
        base_url: env_opt("DATA_GOV_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        resource_id: env_opt("DATA_GOV_RESOURCE_ID")
            .unwrap_or_else(|| DEFAULT_RESOURCE_ID.to_string()),
        api_key: require_env("DATA_GOV_API_KEY")?,
        connect_timeout: config.connect_timeout,
        read_timeout: config.read_timeout,
    })
}

/// Returns the progress file location from `MANDI_SYNC_STATE_FILE`, or the
/// default under `logs/`.
#[must_use]
pub fn state_file_from_env() -> PathBuf {
    env_opt("MANDI_SYNC_STATE_FILE").map_or_else(paths::default_state_file, PathBuf::from)
}

/// Parses an IANA timezone name.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the name is unknown.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>().map_err(|e| ConfigError::Invalid {
        name: "timezone",
        message: format!("{name}: {e}"),
    })
}

/// Rejects settings the run loop cannot work with.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first bad setting.
pub fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    let invalid = |name: &'static str, message: &str| {
        Err(ConfigError::Invalid {
            name,
            message: message.to_string(),
        })
    };

    if config.page_size == 0 {
        return invalid("page_size", "must be at least 1");
    }
    if config.rollover_hour > 23 {
        return invalid("rollover_hour", "must be between 0 and 23");
    }
    if !(0.0..=1.0).contains(&config.jitter_ratio) {
        return invalid("jitter_ratio", "must be between 0 and 1");
    }
    if config.initial_backoff > config.max_backoff {
        return invalid("initial_backoff", "must not exceed max_backoff");
    }
    if config.max_runtime > MAX_RUNTIME_LIMIT {
        return invalid("max_runtime", "must not exceed 7 days");
    }
    for (name, value) in [
        ("max_backoff", config.max_backoff),
        ("connect_timeout", config.connect_timeout),
        ("read_timeout", config.read_timeout),
        ("success_sleep", config.success_sleep),
    ] {
        if value > MAX_DELAY_LIMIT {
            return invalid(name, "must not exceed 24 hours");
        }
    }
    if config.max_consecutive_errors == 0 {
        return invalid("max_consecutive_errors", "must be at least 1");
    }
    if config.max_state_partitions == 0 {
        return invalid("max_state_partitions", "must be at least 1");
    }
    parse_timezone(&config.timezone)?;

    Ok(())
}
