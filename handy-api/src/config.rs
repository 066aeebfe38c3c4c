//! API Configuration Module
//!
//! CORS, rate limiting, bind address, and the marketplace tunables that the
//! operator may override. Configuration is loaded from `HANDY_*` environment
//! variables with development defaults.

use std::net::SocketAddr;
use std::time::Duration;

use handy_core::{CompletionPolicy, ConfigError, MarketConfig};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS, rate limiting, and the domain services.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    pub rate_limit_enabled: bool,

    /// Requests per minute for unauthenticated callers, per IP.
    pub rate_limit_unauthenticated: u32,

    /// Requests per minute for authenticated callers, per user.
    pub rate_limit_authenticated: u32,

    /// Burst capacity beyond the steady rate.
    pub rate_limit_burst: u32,

    pub rate_limit_window: Duration,

    // ========================================================================
    // Server and domain
    // ========================================================================
    pub bind_addr: SocketAddr,

    pub market: MarketConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,

            rate_limit_enabled: true,
            rate_limit_unauthenticated: 100,
            rate_limit_authenticated: 1000,
            rate_limit_burst: 10,
            rate_limit_window: Duration::from_secs(60),

            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            market: MarketConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `HANDY_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `HANDY_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `HANDY_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `HANDY_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `HANDY_RATE_LIMIT_UNAUTHENTICATED`: Requests per minute per IP (default: 100)
    /// - `HANDY_RATE_LIMIT_AUTHENTICATED`: Requests per minute per user (default: 1000)
    /// - `HANDY_RATE_LIMIT_BURST`: Burst capacity (default: 10)
    /// - `HANDY_COMPLETION_POLICY`: `poster_only` or `poster_or_helper`
    /// - `HANDY_PAGE_LIMIT_MAX`: Largest page any listing returns (default: 100)
    /// - `HANDY_EVENT_CAPACITY`: Realtime channel buffer (default: 1024)
    /// - `HANDY_API_BIND`, `PORT` / `HANDY_API_PORT`: Listen address (default: 0.0.0.0:3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cors_origins = lookup("HANDY_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = lookup("HANDY_CORS_ALLOW_CREDENTIALS")
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.cors_allow_credentials);

        let rate_limit_enabled = lookup("HANDY_RATE_LIMIT_ENABLED")
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.rate_limit_enabled);

        let mut market = MarketConfig::default();
        if let Some(raw) = lookup("HANDY_COMPLETION_POLICY") {
            market.completion_policy = raw.parse::<CompletionPolicy>()?;
        }
        market.max_page_limit =
            parse_or(&lookup, "HANDY_PAGE_LIMIT_MAX", market.max_page_limit)?;
        market.event_capacity = parse_or(&lookup, "HANDY_EVENT_CAPACITY", market.event_capacity)?;
        market.validate().map_err(|e| ConfigError::InvalidValue {
            field: "market".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })?;

        let host = lookup("HANDY_API_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .or_else(|| lookup("HANDY_API_PORT"))
            .unwrap_or_else(|| "3000".to_string());
        let addr = format!("{}:{}", host, port);
        let bind_addr = addr.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            field: "bind_addr".to_string(),
            value: addr.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: parse_or(
                &lookup,
                "HANDY_CORS_MAX_AGE_SECS",
                defaults.cors_max_age_secs,
            )?,
            rate_limit_enabled,
            rate_limit_unauthenticated: parse_or(
                &lookup,
                "HANDY_RATE_LIMIT_UNAUTHENTICATED",
                defaults.rate_limit_unauthenticated,
            )?,
            rate_limit_authenticated: parse_or(
                &lookup,
                "HANDY_RATE_LIMIT_AUTHENTICATED",
                defaults.rate_limit_authenticated,
            )?,
            rate_limit_burst: parse_or(&lookup, "HANDY_RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_window: defaults.rate_limit_window,
            bind_addr,
            market,
        })
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.handy.run
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_unauthenticated, 100);
        assert_eq!(config.rate_limit_authenticated, 1000);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.market.completion_policy, CompletionPolicy::PosterOnly);
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("HANDY_CORS_ORIGINS", "https://handy.run, https://app.handy.run"),
            ("HANDY_RATE_LIMIT_ENABLED", "false"),
            ("HANDY_COMPLETION_POLICY", "poster_or_helper"),
            ("HANDY_PAGE_LIMIT_MAX", "200"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.rate_limit_enabled);
        assert_eq!(config.market.completion_policy, CompletionPolicy::PosterOrHelper);
        assert_eq!(config.market.max_page_limit, 200);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ApiConfig::from_lookup(lookup(&[("HANDY_COMPLETION_POLICY", "anyone")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("HANDY_EVENT_CAPACITY", "0")])).is_err());
        // A cap below the default page size is inconsistent.
        assert!(ApiConfig::from_lookup(lookup(&[("HANDY_PAGE_LIMIT_MAX", "5")])).is_err());
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("http://localhost:5173"));

        config.cors_origins = vec!["https://handy.run".to_string(), "*.handy.run".to_string()];
        assert!(config.is_production());
        assert!(config.is_origin_allowed("https://handy.run"));
        assert!(config.is_origin_allowed("https://app.handy.run"));
        assert!(!config.is_origin_allowed("https://nothandy.run"));
        assert!(!config.is_origin_allowed("https://evil.com"));
    }
}
