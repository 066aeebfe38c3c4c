//! Configuration loading for the Handy client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_endpoint: String,
    /// Bearer token issued by the identity gateway. Optional: a session can
    /// also be started later with [`crate::Session::login`].
    pub token: Option<String>,
    pub request_timeout_ms: u64,
    /// Extra attempts for idempotent reads after a network failure.
    pub max_retries: u32,
    pub retry: BackoffConfig,
    pub reconnect: BackoffConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

impl BackoffConfig {
    /// Delay before attempt `attempt` (0-based), jitter excluded.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let factor = self.multiplier.powi(attempt.min(32) as i32);
        let delay = (self.initial_ms as f64 * factor).min(self.max_ms as f64);
        delay as u64
    }

    fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        if self.initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: section,
                reason: "initial_ms must be > 0".to_string(),
            });
        }
        if self.max_ms < self.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: section,
                reason: "max_ms must be >= initial_ms".to_string(),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: section,
                reason: "multiplier must be >= 1.0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or HANDY_CLIENT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url, schemes) in [
            ("api_base_url", &self.api_base_url, ["http://", "https://"]),
            ("ws_endpoint", &self.ws_endpoint, ["ws://", "wss://"]),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
            if !schemes.iter().any(|s| url.starts_with(s)) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must start with {}", schemes.join(" or ")),
                });
            }
        }
        if matches!(&self.token, Some(token) if token.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "token",
                reason: "must not be blank when present".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        self.retry.validate("retry")?;
        self.reconnect.validate("reconnect")?;
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("HANDY_CLIENT_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
api_base_url = "http://localhost:3000"
ws_endpoint = "ws://localhost:3000/api/v1/ws"
token = "abc.def.ghi"
request_timeout_ms = 5000
max_retries = 3

[retry]
initial_ms = 100
max_ms = 2000
multiplier = 2.0
jitter_ms = 50

[reconnect]
initial_ms = 500
max_ms = 30000
multiplier = 2.0
jitter_ms = 250
"#;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();
        let config = ClientConfig::from_path(file.path()).unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.token.as_deref(), Some("abc.def.ghi"));
        assert_eq!(config.reconnect.initial_ms, 500);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let contents = VALID.replace("[retry]", "tenant = 1\n\n[retry]");
        assert!(matches!(
            ClientConfig::from_toml(&contents),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let bad_scheme = VALID.replace("ws://localhost", "http://localhost");
        assert!(matches!(
            ClientConfig::from_toml(&bad_scheme),
            Err(ConfigError::InvalidValue { field: "ws_endpoint", .. })
        ));

        let bad_backoff = VALID.replace("max_ms = 2000", "max_ms = 10");
        assert!(matches!(
            ClientConfig::from_toml(&bad_backoff),
            Err(ConfigError::InvalidValue { field: "retry", .. })
        ));

        let blank_token = VALID.replace("\"abc.def.ghi\"", "\"  \"");
        assert!(matches!(
            ClientConfig::from_toml(&blank_token),
            Err(ConfigError::InvalidValue { field: "token", .. })
        ));
    }

    #[test]
    fn test_backoff_grows_to_cap() {
        let backoff = BackoffConfig {
            initial_ms: 100,
            max_ms: 1000,
            multiplier: 2.0,
            jitter_ms: 0,
        };
        assert_eq!(backoff.delay_ms(0), 100);
        assert_eq!(backoff.delay_ms(1), 200);
        assert_eq!(backoff.delay_ms(3), 800);
        assert_eq!(backoff.delay_ms(4), 1000);
        assert_eq!(backoff.delay_ms(40), 1000);
    }

    mod prop_tests {
        use super::super::BackoffConfig;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_delay_is_monotonic_and_capped(
                initial in 1u64..1_000,
                extra in 0u64..60_000,
                multiplier in 1.0f64..4.0,
                attempt in 0u32..64,
            ) {
                let backoff = BackoffConfig {
                    initial_ms: initial,
                    max_ms: initial + extra,
                    multiplier,
                    jitter_ms: 0,
                };
                let now = backoff.delay_ms(attempt);
                let next = backoff.delay_ms(attempt + 1);
                prop_assert!(now >= initial.min(backoff.max_ms));
                prop_assert!(now <= backoff.max_ms);
                prop_assert!(next >= now);
            }
        }
    }
}
