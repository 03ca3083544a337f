//! Handler defaults: timeouts and TLS peer verification.
//!
//! Durations are expressed in whole seconds both in serialized form and in
//! the environment.

use std::time::Duration;

use serde::{de, Deserialize, Deserializer};

use crate::error::ConfigError;

pub const CONNECT_TIMEOUT_VAR: &str = "EFRONT_SDK_CONNECT_TIMEOUT";
pub const TIMEOUT_VAR: &str = "EFRONT_SDK_TIMEOUT";
pub const VERIFY_PEER_VAR: &str = "EFRONT_SDK_VERIFY_PEER";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings installed by `RequestHandler::init_with`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    #[serde(deserialize_with = "seconds")]
    pub connect_timeout: Duration,
    #[serde(deserialize_with = "seconds")]
    pub timeout: Duration,
    pub verify_peer: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            verify_peer: false,
        }
    }
}

impl HandlerConfig {
    /// Defaults overridden by any `EFRONT_SDK_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(CONNECT_TIMEOUT_VAR) {
            config.connect_timeout = parse_seconds(CONNECT_TIMEOUT_VAR, value)?;
        }
        if let Some(value) = lookup(TIMEOUT_VAR) {
            config.timeout = parse_seconds(TIMEOUT_VAR, value)?;
        }
        if let Some(value) = lookup(VERIFY_PEER_VAR) {
            config.verify_peer = parse_flag(VERIFY_PEER_VAR, value)?;
        }
        Ok(config)
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match u64::deserialize(deserializer)? {
        0 => Err(de::Error::custom("timeout must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_seconds(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            var,
            value,
            reason: "timeout must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_match_sdk_settings() {
        let config = HandlerConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.verify_peer);
    }

    #[test]
    fn lookup_without_vars_gives_defaults() {
        let config = HandlerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HandlerConfig::default());
    }

    #[test]
    fn lookup_overrides_fields() {
        let config = HandlerConfig::from_lookup(lookup(&[
            (CONNECT_TIMEOUT_VAR, "5"),
            (TIMEOUT_VAR, " 15 "),
            (VERIFY_PEER_VAR, "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.verify_peer);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = HandlerConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: TIMEOUT_VAR, .. }));
    }

    #[test]
    fn malformed_flag_is_rejected() {
        let err = HandlerConfig::from_lookup(lookup(&[(VERIFY_PEER_VAR, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn deserializes_seconds_with_defaults() {
        let config: HandlerConfig = serde_json::from_str(r#"{"timeout":10}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(!config.verify_peer);
    }

    #[test]
    fn deserializing_zero_seconds_fails() {
        let err = serde_json::from_str::<HandlerConfig>(r#"{"timeout":0}"#).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert!(serde_json::from_str::<HandlerConfig>(r#"{"connect_timeout":0}"#).is_err());
    }
}
