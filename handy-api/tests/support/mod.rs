//! Shared harness for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use handy_api::auth::FixedClock;
use handy_api::{
    generate_jwt_token, ApiConfig, AuthConfig, IdentityGateway, JwtIdentityGateway,
    SecureRouterBuilder,
};
use handy_core::UserRole;
use handy_market::{AuthContext, Marketplace};
use handy_test_utils::fixtures;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const NOW: i64 = 1_760_000_000;

/// A router over an in-memory marketplace the test can also drive directly.
pub struct TestApp {
    pub router: Router,
    pub marketplace: Marketplace,
    pub auth: AuthConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = ApiConfig::default();
        config.rate_limit_enabled = false;
        Self::with_config(config)
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let marketplace = fixtures::seeded_marketplace();
        let auth = AuthConfig::with_secret(TEST_SECRET, Arc::new(FixedClock(NOW)))
            .expect("test secret must be valid");
        let gateway: Arc<dyn IdentityGateway> = Arc::new(JwtIdentityGateway::new(auth.clone()));
        let router = SecureRouterBuilder::new(marketplace.clone(), config, gateway).build();
        Self {
            router,
            marketplace,
            auth,
        }
    }

    /// A caller identity with a signed token. Not provisioned until it makes a request.
    pub fn user(&self, role: UserRole, name: &str) -> (AuthContext, String) {
        let ctx = fixtures::caller(role, name);
        let token = generate_jwt_token(&self.auth, ctx.user_id, &ctx.email, ctx.role)
            .expect("token generation must succeed");
        (ctx, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), String> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .map_err(|e| e.to_string())?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value), String> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: &str,
        body: Value,
    ) -> Result<(StatusCode, Value), String> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }
}

pub fn ac_check_body() -> Value {
    serde_json::to_value(fixtures::ac_check_draft()).expect("draft serializes")
}

pub fn id_of(value: &Value) -> Result<String, String> {
    value["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("no id in {}", value))
}
