//! Runtime configuration from environment variables.
//!
//! # Responsibility
//! - Resolve API endpoint, HTTP timeout, autosave timings and log level.
//! - Fall back to defaults for unset variables.
//!
//! # Invariants
//! - Set-but-malformed values are rejected instead of silently defaulted.
//! - Durations are always non-zero.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "SCITREK_API_BASE_URL";
pub const ENV_HTTP_TIMEOUT_MS: &str = "SCITREK_HTTP_TIMEOUT_MS";
pub const ENV_AUTOSAVE_DEBOUNCE_MS: &str = "SCITREK_AUTOSAVE_DEBOUNCE_MS";
pub const ENV_AUTOSAVE_INTERVAL_MS: &str = "SCITREK_AUTOSAVE_INTERVAL_MS";
pub const ENV_LOG_LEVEL: &str = "SCITREK_LOG_LEVEL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} value `{}`: {}", self.key, self.value, self.message)
    }
}

impl Error for ConfigError {}

/// REST client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Autosave timings shared by every lesson page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a debounced save.
    pub debounce_delay: Duration,
    /// Period of the dirty-only safety flush.
    pub flush_interval: Duration,
}

impl AutosaveConfig {
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(1500);
    pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(15);

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            flush_interval: Self::DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Full client-side configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub autosave: AutosaveConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ClientConfig::default();
        let api_base_url = match non_empty(&lookup, ENV_API_BASE_URL) {
            Some(raw) => normalize_base_url(&raw)?,
            None => defaults.api_base_url,
        };
        let request_timeout =
            duration_ms(&lookup, ENV_HTTP_TIMEOUT_MS)?.unwrap_or(defaults.request_timeout);
        let debounce_delay = duration_ms(&lookup, ENV_AUTOSAVE_DEBOUNCE_MS)?
            .unwrap_or(AutosaveConfig::DEFAULT_DEBOUNCE_DELAY);
        let flush_interval = duration_ms(&lookup, ENV_AUTOSAVE_INTERVAL_MS)?
            .unwrap_or(AutosaveConfig::DEFAULT_FLUSH_INTERVAL);
        let log_level = non_empty(&lookup, ENV_LOG_LEVEL)
            .unwrap_or_else(|| crate::logging::default_log_level().to_string());

        Ok(Self {
            client: ClientConfig {
                api_base_url,
                request_timeout,
            },
            autosave: AutosaveConfig {
                debounce_delay,
                flush_interval,
            },
            log_level,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Option<String> {
    let value = lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty());
    if value.is_none() {
        info!("event=config_default module=config key={key}");
    }
    value
}

fn duration_ms(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError {
            key,
            value: raw,
            message: "must be greater than zero".to_string(),
        }),
        Ok(ms) => Ok(Some(Duration::from_millis(ms))),
        Err(err) => Err(ConfigError {
            key,
            value: raw,
            message: err.to_string(),
        }),
    }
}

/// Trims trailing slashes and requires an http(s) scheme.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError {
            key: ENV_API_BASE_URL,
            value: raw.to_string(),
            message: "expected an http:// or https:// URL".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
