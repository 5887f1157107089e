//! Configuration types.
//!
//! Everything is read from the environment. Each `from_env` has a
//! `from_lookup` twin that takes the variable source as a closure so tests
//! never have to touch the process environment.

use std::time::Duration;

use crate::directory::RetryPolicy;
use crate::error::ConfigError;

/// Hosted mock directory resource used when nothing else is configured.
pub const DEFAULT_DIRECTORY_URL: &str = "https://67e14fb758cc6bf785254550.mockapi.io/pharmacies";

/// Sentinel for `PHARMESOL_DIRECTORY_URL` that starts the in-process mock directory.
pub const LOCAL_DIRECTORY: &str = "local";

/// Per-call conversation engine configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name the assistant introduces itself with.
    pub bot_name: String,
    /// AI extraction failures tolerated before a call falls back to manual mode.
    pub max_extraction_failures: u32,
    /// Transcript turns sent along with a free-form reply request.
    pub history_window: usize,
    pub extraction_max_tokens: u32,
    pub extraction_temperature: f32,
    pub response_max_tokens: u32,
    pub response_temperature: f32,
    /// Callback slot used when the caller names no time.
    pub default_callback_time: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bot_name: "Alex".to_string(),
            max_extraction_failures: 3,
            history_window: 10,
            extraction_max_tokens: 100,
            extraction_temperature: 0.0,
            response_max_tokens: 300,
            response_temperature: 0.7,
            default_callback_time: "tomorrow at 2 PM".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bot_name: lookup("PHARMESOL_BOT_NAME")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.bot_name),
            ..defaults
        }
    }
}

/// Pharmacy directory connection settings.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Collection resource, e.g. `https://host/pharmacies`, or [`LOCAL_DIRECTORY`].
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Timeout for the availability probe.
    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_URL.to_string(),
            timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl DirectoryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or blank variables take their defaults; values that are set but
    /// unparseable are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("PHARMESOL_DIRECTORY_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.base_url);

        let timeout = parse_var::<u64, _>(&lookup, "PHARMESOL_DIRECTORY_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_attempts = match parse_var::<u32, _>(&lookup, "PHARMESOL_DIRECTORY_RETRIES")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "PHARMESOL_DIRECTORY_RETRIES".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            Some(n) => n,
            None => defaults.retry.max_attempts,
        };

        Ok(Self {
            base_url,
            timeout,
            probe_timeout: defaults.probe_timeout,
            retry: RetryPolicy {
                max_attempts,
                ..defaults.retry
            },
        })
    }

    /// Whether the in-process mock directory should be started.
    pub fn is_local(&self) -> bool {
        self.base_url.eq_ignore_ascii_case(LOCAL_DIRECTORY)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn agent_defaults() {
        let config = AgentConfig::from_lookup(|_| None);
        assert_eq!(config.bot_name, "Alex");
        assert_eq!(config.max_extraction_failures, 3);
        assert_eq!(config.history_window, 10);
        assert_eq!(config.default_callback_time, "tomorrow at 2 PM");
    }

    #[test]
    fn agent_bot_name_override() {
        let config = AgentConfig::from_lookup(lookup_from(&[("PHARMESOL_BOT_NAME", " Jamie ")]));
        assert_eq!(config.bot_name, "Jamie");

        let blank = AgentConfig::from_lookup(lookup_from(&[("PHARMESOL_BOT_NAME", "  ")]));
        assert_eq!(blank.bot_name, "Alex");
    }

    #[test]
    fn directory_defaults() {
        let config = DirectoryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, DEFAULT_DIRECTORY_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(!config.is_local());
    }

    #[test]
    fn directory_overrides() {
        let config = DirectoryConfig::from_lookup(lookup_from(&[
            ("PHARMESOL_DIRECTORY_URL", "http://127.0.0.1:9000/pharmacies/"),
            ("PHARMESOL_DIRECTORY_TIMEOUT_SECS", "2"),
            ("PHARMESOL_DIRECTORY_RETRIES", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000/pharmacies");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn directory_rejects_unparseable_values() {
        let err = DirectoryConfig::from_lookup(lookup_from(&[("PHARMESOL_DIRECTORY_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::InvalidValue { key, .. } if key == "PHARMESOL_DIRECTORY_TIMEOUT_SECS"),
            "{err}"
        );

        let err = DirectoryConfig::from_lookup(lookup_from(&[("PHARMESOL_DIRECTORY_RETRIES", "0")])).unwrap_err();
        assert!(err.to_string().contains("at least 1"), "{err}");

        let err = DirectoryConfig::from_lookup(lookup_from(&[("PHARMESOL_DIRECTORY_RETRIES", "-2")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn directory_blank_values_use_defaults() {
        let config = DirectoryConfig::from_lookup(lookup_from(&[
            ("PHARMESOL_DIRECTORY_TIMEOUT_SECS", "  "),
            ("PHARMESOL_DIRECTORY_RETRIES", ""),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn directory_local_sentinel() {
        let config = DirectoryConfig::from_lookup(lookup_from(&[("PHARMESOL_DIRECTORY_URL", "LOCAL")])).unwrap();
        assert!(config.is_local());
    }
}
