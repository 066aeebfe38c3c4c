//! Authentication Module
//!
//! Identity is owned by an external gateway. The API only verifies the HS256
//! bearer tokens it issues and turns their claims into a
//! [`handy_market::AuthContext`]. The [`IdentityGateway`] trait is the seam
//! between the two; [`JwtIdentityGateway`] is the implementation used in
//! production and tests.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use handy_core::{ConfigError, HandyError, UserId, UserRole};
use handy_market::AuthContext;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Source of "now" for token time checks.
///
/// Time validation is done here rather than inside `jsonwebtoken` so tests can
/// pin the clock.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Always returns the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// JWT signing secret that never shows up in logs or Debug output.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, HandyError> {
        if secret.is_empty() {
            return Err(HandyError::Config(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            }));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of tokens minted by [`generate_jwt_token`], in seconds.
    pub jwt_expiration_secs: i64,

    /// Tolerated clock drift when checking `exp`, in seconds.
    pub jwt_clock_skew_secs: i64,

    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(None),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `HANDY_JWT_SECRET`: JWT signing secret shared with the identity gateway
    /// - `HANDY_JWT_EXPIRATION_SECS`: JWT token expiration (default: 3600)
    /// - `HANDY_JWT_CLOCK_SKEW_SECS`: JWT clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: build_jwt_secret(std::env::var("HANDY_JWT_SECRET").ok()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("HANDY_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("HANDY_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        };
        if config.jwt_secret.is_insecure_default() {
            tracing::warn!(
                "Using the development JWT secret. Set HANDY_JWT_SECRET to the \
                 identity gateway's signing secret before deploying."
            );
        } else if config.jwt_secret.len() < 32 {
            tracing::warn!(
                secret_len = config.jwt_secret.len(),
                "JWT secret is shorter than 32 characters"
            );
        }
        config
    }

    /// Refuse to start in production with the development secret or a short one.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.jwt_secret.is_insecure_default() {
            return Err(ApiError::invalid_input(
                "HANDY_JWT_SECRET must be set in production",
            ));
        }
        if self.jwt_secret.len() < 32 {
            return Err(ApiError::invalid_input(
                "HANDY_JWT_SECRET must be at least 32 characters in production",
            ));
        }
        Ok(())
    }

    /// Config with a fixed secret and clock, for tests and local tooling.
    pub fn with_secret(secret: &str, clock: Arc<dyn JwtClock>) -> ApiResult<Self> {
        let jwt_secret = JwtSecret::new(secret.to_string())
            .map_err(|e| ApiError::invalid_input(e.to_string()))?;
        Ok(Self {
            jwt_secret,
            clock,
            ..Self::default()
        })
    }
}

fn build_jwt_secret(secret: Option<String>) -> JwtSecret {
    let normalized = secret
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| INSECURE_DEFAULT_SECRET.to_string());
    JwtSecret(SecretString::new(normalized.into()))
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// Claims carried by gateway-issued tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: UserId,

    pub email: String,

    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        role: UserRole,
        expiration_secs: i64,
        clock: &dyn JwtClock,
    ) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: user_id,
            email: email.into(),
            role,
            iat: now,
            exp: now + expiration_secs,
        }
    }

    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }

    pub fn into_context(self) -> AuthContext {
        AuthContext::new(self.sub, self.email, self.role)
    }
}

// ============================================================================
// TOKEN VALIDATION
// ============================================================================

/// Check the signature, then `exp` against the configured clock and skew.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;
    let now = config.clock.now_epoch_secs();
    if claims.exp < now - config.jwt_clock_skew_secs {
        return Err(ApiError::token_expired());
    }
    Ok(claims)
}

/// Mint a token the way the identity gateway would. Development and tests only.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: UserId,
    email: &str,
    role: UserRole,
) -> ApiResult<String> {
    let claims = Claims::new(
        user_id,
        email,
        role,
        config.jwt_expiration_secs,
        &*config.clock,
    );
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

// ============================================================================
// IDENTITY GATEWAY
// ============================================================================

/// Turns a bearer token into the caller's identity.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn authenticate(&self, token: &str) -> ApiResult<AuthContext>;
}

/// Verifies tokens locally with the secret shared with the gateway.
#[derive(Debug, Clone)]
pub struct JwtIdentityGateway {
    config: AuthConfig,
}

impl JwtIdentityGateway {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[async_trait]
impl IdentityGateway for JwtIdentityGateway {
    async fn authenticate(&self, token: &str) -> ApiResult<AuthContext> {
        validate_jwt_token(&self.config, token).map(Claims::into_context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    /// 2024-01-01 00:00:00 UTC
    const NOW: i64 = 1704067200;

    fn test_config() -> AuthConfig {
        AuthConfig::with_secret("test_secret", Arc::new(FixedClock(NOW)))
            .expect("Test secret should be valid")
    }

    #[test]
    fn test_jwt_generation_and_validation() -> ApiResult<()> {
        let config = test_config();
        let user_id = UserId::now_v7();
        let token = generate_jwt_token(&config, user_id, "pat@example.com", UserRole::Poster)?;

        let claims = validate_jwt_token(&config, &token)?;
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "pat@example.com");
        assert_eq!(claims.role, UserRole::Poster);
        assert!(!claims.is_expired(&FixedClock(NOW)));
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7(), "h@example.com", UserRole::Helper)?;

        config.clock = Arc::new(FixedClock(NOW + 3600 + 61));
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);

        // Inside the skew window the token is still accepted.
        config.clock = Arc::new(FixedClock(NOW + 3600 + 30));
        assert!(validate_jwt_token(&config, &token).is_ok());
        Ok(())
    }

    #[test]
    fn test_wrong_secret_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7(), "a@example.com", UserRole::Admin)?;

        let other = AuthConfig::with_secret("another_secret", Arc::new(FixedClock(NOW)))?;
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        assert!(validate_jwt_token(&config, "not.a.jwt").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_gateway_builds_context() -> ApiResult<()> {
        let config = test_config();
        let user_id = UserId::now_v7();
        let token = generate_jwt_token(&config, user_id, "h@example.com", UserRole::Helper)?;

        let ctx = JwtIdentityGateway::new(config).authenticate(&token).await?;
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.role, UserRole::Helper);
        Ok(())
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = test_config();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("test_secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_production_rejects_weak_secrets() {
        assert!(AuthConfig::default().validate_for_production().is_err());
        assert!(test_config().validate_for_production().is_err());
        let strong = AuthConfig::with_secret(&"k".repeat(48), Arc::new(SystemClock))
            .expect("Test secret should be valid");
        assert!(strong.validate_for_production().is_ok());
    }

    #[test]
    fn test_empty_secret_falls_back_to_default() {
        assert!(build_jwt_secret(Some("  ".to_string())).is_insecure_default());
        assert!(build_jwt_secret(None).is_insecure_default());
        assert!(JwtSecret::new(String::new()).is_err());
    }
}
