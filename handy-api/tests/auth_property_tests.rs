//! Property tests for bearer-token handling.

mod support;

use std::sync::Arc;

use handy_api::auth::FixedClock;
use handy_api::{generate_jwt_token, validate_jwt_token, AuthConfig, ErrorCode};
use handy_core::{UserId, UserRole};
use proptest::prelude::*;
use support::{NOW, TEST_SECRET};

fn arb_role() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Poster),
        Just(UserRole::Helper),
        Just(UserRole::Admin),
    ]
}

fn config_at(now: i64) -> AuthConfig {
    AuthConfig::with_secret(TEST_SECRET, Arc::new(FixedClock(now))).expect("valid secret")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Whatever identity was signed comes back out.
    #[test]
    fn prop_token_preserves_identity(
        user in any::<u128>(),
        name in "[a-z]{1,12}",
        role in arb_role(),
    ) {
        let config = config_at(NOW);
        let user_id = UserId::from(uuid::Uuid::from_u128(user));
        let email = format!("{}@example.com", name);
        let token = generate_jwt_token(&config, user_id, &email, role)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let claims = validate_jwt_token(&config, &token)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(claims.sub, user_id);
        prop_assert_eq!(claims.email, email);
        prop_assert_eq!(claims.role, role);
    }

    /// Tokens stay valid through the skew window and expire right after it.
    #[test]
    fn prop_expiry_honors_skew(elapsed in 0i64..20_000) {
        let issuer = config_at(NOW);
        let token = generate_jwt_token(&issuer, UserId::now_v7(), "a@example.com", UserRole::Poster)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let verifier = config_at(NOW + elapsed);
        let deadline = issuer.jwt_expiration_secs + issuer.jwt_clock_skew_secs;
        match validate_jwt_token(&verifier, &token) {
            Ok(_) => prop_assert!(elapsed <= deadline),
            Err(e) => {
                prop_assert!(elapsed > deadline);
                prop_assert_eq!(e.code, ErrorCode::TokenExpired);
            }
        }
    }

    /// Any single-character corruption of the signature is rejected.
    #[test]
    fn prop_tampered_signature_rejected(position in 0usize..40) {
        let config = config_at(NOW);
        let token = generate_jwt_token(&config, UserId::now_v7(), "a@example.com", UserRole::Helper)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let signature_start = token.rfind('.').map(|i| i + 1).unwrap_or(0);
        // The final character carries padding bits, so leave it alone.
        let span = token.len() - signature_start - 1;
        let index = signature_start + position % span;
        let mut bytes = token.into_bytes();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;

        let err = validate_jwt_token(&config, &tampered);
        prop_assert!(err.is_err());
    }
}
