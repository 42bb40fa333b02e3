//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory store, mints identity tokens
//! signed with the test secret, and wraps request/response plumbing.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bugtrack_api::app::{build_router, AppState};
use bugtrack_api::config::{ApiConfig, AuthConfig, Config, LogFormat, StoreBackend, StoreConfig};
use bugtrack_shared::auth::jwt::{create_token, IdentityClaims};
use bugtrack_shared::auth::verifier::JwtVerifier;
use bugtrack_shared::models::user::{CreateUser, User, UserRole};
use bugtrack_shared::store::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-characters-long";
pub const TEST_ISSUER: &str = "bugtrack-identity";

/// Test context containing the app and its backing store
pub struct TestContext {
    pub app: Router,
    pub store: MemoryStore,
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let verifier = JwtVerifier::new(TEST_SECRET, TEST_ISSUER);
        let state = AppState::new(Arc::new(store.clone()), Arc::new(verifier), test_config());

        Self {
            app: build_router(state),
            store,
        }
    }

    /// Bearer header for a subject; the user is created on first use
    pub fn auth_header(&self, subject: &str) -> String {
        let claims = IdentityClaims::new(subject, TEST_ISSUER)
            .with_email(format!("{}@example.com", subject))
            .with_name(subject);
        let token = create_token(&claims, TEST_SECRET).expect("token");
        format!("Bearer {}", token)
    }

    /// Seeds a user with a chosen role under `subject`
    pub async fn seed_user(&self, subject: &str, role: UserRole) -> User {
        self.store
            .insert_user(User::from_create(CreateUser {
                external_id: subject.to_string(),
                email: format!("{}@example.com", subject),
                name: subject.to_string(),
                role,
            }))
            .await
            .expect("seed user")
    }

    /// Resolves `subject` through `/v1/auth/me` and returns its user id
    pub async fn login(&self, subject: &str) -> String {
        let (status, body) = self.send("GET", "/v1/auth/me", Some(subject), None).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["id"].as_str().expect("user id").to_string()
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        subject: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            builder = builder.header("authorization", self.auth_header(subject));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
            cors_origins: vec!["*".to_string()],
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            database_url: String::new(),
            max_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            issuer: TEST_ISSUER.to_string(),
        },
        log_format: LogFormat::Pretty,
    }
}
